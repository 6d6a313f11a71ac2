//! Barcode and QR code elements.
//!
//! Linear symbols are encoded with `barcoders` and stretched to the element
//! box: each module is `width / modules` pixels wide (at least one), and
//! the symbol is centred. With `show_text` the encoded value is printed
//! underneath in the bitmap font.

use barcoders::sym::code39::Code39;
use barcoders::sym::code128::Code128;
use barcoders::sym::ean8::EAN8;
use barcoders::sym::ean13::EAN13;
use qrcode::{EcLevel, QrCode};

use super::text::Align;
use super::{Element, Geometry, Style, text_value};
use crate::binding::BoundValue;
use crate::error::ElementError;
use crate::render::{Region, Typeface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Symbology {
    #[default]
    Code128,
    Code39,
    Ean13,
    Ean8,
}

impl Symbology {
    pub fn parse(s: &str) -> Option<Symbology> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "code128" => Some(Symbology::Code128),
            "code39" => Some(Symbology::Code39),
            "ean13" => Some(Symbology::Ean13),
            "ean8" => Some(Symbology::Ean8),
            _ => None,
        }
    }

    /// Modules of the encoded symbol, 1 = bar.
    pub fn encode(self, data: &str) -> Result<Vec<u8>, ElementError> {
        let failed = |e: barcoders::error::Error| {
            ElementError::Render(format!("cannot encode '{}' as {:?}: {}", data, self, e))
        };
        match self {
            // Character set B covers printable ASCII
            Symbology::Code128 => Ok(Code128::new(&format!("\u{0181}{}", data)).map_err(failed)?.encode()),
            Symbology::Code39 => Ok(Code39::new(data).map_err(failed)?.encode()),
            Symbology::Ean13 => Ok(EAN13::new(data).map_err(failed)?.encode()),
            Symbology::Ean8 => Ok(EAN8::new(data).map_err(failed)?.encode()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarcodeElement {
    pub symbology: Symbology,
    pub show_text: bool,
    /// Module width in pixels; fitted to the box when absent.
    pub module_width: Option<u32>,
}

impl BarcodeElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        let symbology = match style.str("symbology")? {
            Some(s) => Symbology::parse(s)
                .ok_or_else(|| style.invalid(format!("unknown symbology '{}'", s)))?,
            None => Symbology::default(),
        };
        Ok(Self {
            symbology,
            show_text: style.bool("show_text")?.unwrap_or(true),
            module_width: style.u32("module_width")?.filter(|w| *w > 0),
        })
    }
}

impl Element for BarcodeElement {
    fn render(
        &self,
        geometry: &Geometry,
        value: &BoundValue,
        region: &mut Region<'_>,
    ) -> Result<(), ElementError> {
        let data = text_value("barcode", value)?
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ElementError::Render("barcode has no data".to_string()))?;
        let modules = self.symbology.encode(data)?;

        let module_width = self
            .module_width
            .unwrap_or(geometry.width / modules.len().max(1) as u32)
            .max(1);
        let symbol_width = module_width * modules.len() as u32;
        let left = Align::Center.offset(geometry.width, symbol_width);

        let text_size = (geometry.height / 5).clamp(8, 24);
        let bar_height = if self.show_text {
            geometry.height.saturating_sub(text_size + 2).max(1)
        } else {
            geometry.height
        };

        for (i, module) in modules.iter().enumerate() {
            if *module == 1 {
                region.fill_rect(left + (i as u32 * module_width) as i32, 0, module_width, bar_height);
            }
        }

        if self.show_text {
            let face = Typeface::Bitmap;
            let width = face.measure(data, text_size, false);
            let x = Align::Center.offset(geometry.width, width);
            face.draw(region, x, (bar_height + 2) as i32, data, text_size, false);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QrElement {
    pub error_level: EcLevel,
    /// Cell size in pixels; the largest that fits when absent.
    pub cell_size: Option<u32>,
}

impl QrElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        let error_level = match style.str("error_level")? {
            None => EcLevel::M,
            Some(level) => match level.trim().to_ascii_uppercase().as_str() {
                "L" => EcLevel::L,
                "M" => EcLevel::M,
                "Q" => EcLevel::Q,
                "H" => EcLevel::H,
                _ => return Err(style.invalid(format!("unknown error level '{}'", level))),
            },
        };
        Ok(Self {
            error_level,
            cell_size: style.u32("cell_size")?.filter(|s| *s > 0),
        })
    }
}

impl Element for QrElement {
    fn render(
        &self,
        geometry: &Geometry,
        value: &BoundValue,
        region: &mut Region<'_>,
    ) -> Result<(), ElementError> {
        let data = text_value("qr", value)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ElementError::Render("QR code has no data".to_string()))?;

        let code = QrCode::with_error_correction_level(data, self.error_level)
            .map_err(|e| ElementError::Render(format!("QR code generation failed: {}", e)))?;
        let qr_size = code.width() as u32;
        let cell = self
            .cell_size
            .unwrap_or(geometry.width.min(geometry.height) / qr_size.max(1))
            .max(1);
        let pixel_size = qr_size * cell;
        let left = Align::Center.offset(geometry.width, pixel_size);
        let top = Align::Center.offset(geometry.height, pixel_size);

        for qy in 0..qr_size {
            for qx in 0..qr_size {
                if code[(qx as usize, qy as usize)] == qrcode::Color::Dark {
                    region.fill_rect(
                        left + (qx * cell) as i32,
                        top + (qy * cell) as i32,
                        cell,
                        cell,
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::render::Canvas;
    use serde_json::{Map, Value, json};

    fn style_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn render(element: &dyn Element, value: &str, width: u32, height: u32) -> Result<Canvas, ElementError> {
        let geometry = Geometry { x: 0, y: 0, width, height };
        let mut canvas = Canvas::new(width, height, Orientation::Standard).unwrap();
        element.render(
            &geometry,
            &BoundValue::Text(value.into()),
            &mut canvas.region(0, 0, width, height),
        )?;
        Ok(canvas)
    }

    #[test]
    fn test_symbology_parse() {
        assert_eq!(Symbology::parse("EAN-13"), Some(Symbology::Ean13));
        assert_eq!(Symbology::parse("code_39"), Some(Symbology::Code39));
        assert_eq!(Symbology::parse("pdf417"), None);
    }

    #[test]
    fn test_encode_symbologies() {
        assert!(!Symbology::Code128.encode("Hello").unwrap().is_empty());
        assert!(!Symbology::Code39.encode("ABC123").unwrap().is_empty());
        assert!(!Symbology::Ean13.encode("750103131130").unwrap().is_empty());
        assert!(Symbology::Ean8.encode("not digits").is_err());
    }

    #[test]
    fn test_barcode_fills_box_width() {
        let map = style_map(json!({"show_text": false}));
        let element = BarcodeElement::from_style(&Style::new("barcode", &map)).unwrap();
        let canvas = render(&element, "12345", 400, 80).unwrap();
        assert!(canvas.ink() > 0);
        // bars run the full height without text
        let x = (0..400).find(|&x| canvas.is_set(x, 0)).unwrap();
        assert!(canvas.is_set(x, 79));
    }

    #[test]
    fn test_barcode_without_data_fails() {
        let map = Map::new();
        let element = BarcodeElement::from_style(&Style::new("barcode", &map)).unwrap();
        assert!(render(&element, "  ", 200, 80).is_err());
    }

    #[test]
    fn test_qr_is_centered_and_square() {
        let map = style_map(json!({"error_level": "h"}));
        let element = QrElement::from_style(&Style::new("qr", &map)).unwrap();
        let canvas = render(&element, "https://example.com", 200, 100).unwrap();
        assert!(canvas.ink() > 0);
        assert!(!(0..100).any(|y| canvas.is_set(0, y)));
        assert!(!(0..100).any(|y| canvas.is_set(199, y)));
    }

    #[test]
    fn test_qr_rejects_unknown_level() {
        let map = style_map(json!({"error_level": "X"}));
        assert!(QrElement::from_style(&Style::new("qr", &map)).is_err());
    }
}
