//! Text element.
//!
//! | Style | Default |
//! |-------|---------|
//! | `font_size` | label default font size, at most 1000 |
//! | `min_font_size` | 8 |
//! | `fit_step` | 2 |
//! | `auto_fit` | `true` |
//! | `bold` | `false` |
//! | `align` | `left` (`center`, `right`) |
//! | `valign` | `top` (`middle`, `bottom`) |
//! | `font_path` | built-in bitmap font |
//! | `text` | shown when the binding yields nothing |

use std::path::Path;

use super::{Element, Geometry, Style, text_value};
use crate::binding::BoundValue;
use crate::error::ElementError;
use crate::render::fit::{DEFAULT_FIT_STEP, DEFAULT_MIN_FONT_SIZE, FitOptions, fit_text};
use crate::render::{MAX_FONT_SIZE, Region, Typeface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(s: &str) -> Option<Align> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Align::Left),
            "center" | "centre" => Some(Align::Center),
            "right" => Some(Align::Right),
            _ => None,
        }
    }

    /// Offset of content `inner` wide inside `outer`.
    pub fn offset(self, outer: u32, inner: u32) -> i32 {
        match self {
            Align::Left => 0,
            Align::Center => (outer.saturating_sub(inner) / 2) as i32,
            Align::Right => outer.saturating_sub(inner) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    pub fn parse(s: &str) -> Option<VAlign> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Some(VAlign::Top),
            "middle" | "center" => Some(VAlign::Middle),
            "bottom" => Some(VAlign::Bottom),
            _ => None,
        }
    }

    fn offset(self, outer: u32, inner: u32) -> i32 {
        match self {
            VAlign::Top => 0,
            VAlign::Middle => (outer.saturating_sub(inner) / 2) as i32,
            VAlign::Bottom => outer.saturating_sub(inner) as i32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextElement {
    pub face: Typeface,
    pub font_size: u32,
    pub auto_fit: bool,
    pub fit: FitOptions,
    pub align: Align,
    pub valign: VAlign,
    pub fallback: Option<String>,
}

impl TextElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        let font_size = style.u32("font_size")?.unwrap_or(style.default_font_size());
        if font_size == 0 {
            return Err(style.invalid("'font_size' must be positive"));
        }
        let font_size = font_size.min(MAX_FONT_SIZE);

        let align = match style.str("align")? {
            Some(s) => Align::parse(s).ok_or_else(|| style.invalid(format!("unknown align '{}'", s)))?,
            None => Align::default(),
        };
        let valign = match style.str("valign")? {
            Some(s) => VAlign::parse(s).ok_or_else(|| style.invalid(format!("unknown valign '{}'", s)))?,
            None => VAlign::default(),
        };
        let face = match style.str("font_path")? {
            Some(path) => Typeface::load(Path::new(path)).map_err(|e| style.invalid(e.to_string()))?,
            None => Typeface::Bitmap,
        };

        Ok(Self {
            face,
            font_size,
            auto_fit: style.bool("auto_fit")?.unwrap_or(true),
            fit: FitOptions {
                step: style.u32("fit_step")?.unwrap_or(DEFAULT_FIT_STEP),
                min_size: style.u32("min_font_size")?.unwrap_or(DEFAULT_MIN_FONT_SIZE),
                bold: style.bool("bold")?.unwrap_or(false),
            },
            align,
            valign,
            fallback: style.str("text")?.map(str::to_string),
        })
    }
}

impl Element for TextElement {
    fn render(
        &self,
        geometry: &Geometry,
        value: &BoundValue,
        region: &mut Region<'_>,
    ) -> Result<(), ElementError> {
        let Some(text) = text_value("text", value)?.or(self.fallback.as_deref()) else {
            return Ok(());
        };

        let (size, lines) = if self.auto_fit {
            let fitted = fit_text(
                &self.face,
                text,
                geometry.width,
                geometry.height,
                self.font_size,
                self.fit,
            );
            (fitted.size, fitted.lines)
        } else {
            (self.font_size, text.lines().map(str::to_string).collect())
        };

        let line_height = self.face.line_height(size);
        let line_count = u32::try_from(lines.len()).unwrap_or(u32::MAX);
        let block_height = line_height.saturating_mul(line_count);
        let top = self.valign.offset(geometry.height, block_height);

        for (i, line) in lines.iter().enumerate() {
            let width = self.face.measure(line, size, self.fit.bold);
            let x = self.align.offset(geometry.width, width);
            let y = (i64::from(top) + i as i64 * i64::from(line_height)).min(i64::from(i32::MAX)) as i32;
            self.face.draw(region, x, y, line, size, self.fit.bold);
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

    fn element(style: Value) -> Result<TextElement, ElementError> {
        let map: Map<String, Value> = style.as_object().cloned().unwrap_or_default();
        TextElement::from_style(&Style::new("text", &map))
    }

    fn draw(element: &TextElement, value: BoundValue) -> Canvas {
        let geometry = Geometry { x: 0, y: 0, width: 200, height: 60 };
        let mut canvas = Canvas::new(200, 60, Orientation::Standard).unwrap();
        element
            .render(&geometry, &value, &mut canvas.region(0, 0, 200, 60))
            .unwrap();
        canvas
    }

    /// Leftmost inked column.
    fn left_edge(canvas: &Canvas) -> Option<u32> {
        (0..canvas.width()).find(|&x| (0..canvas.height()).any(|y| canvas.is_set(x, y)))
    }

    #[test]
    fn test_style_defaults() {
        let text = element(json!({})).unwrap();
        assert_eq!(text.font_size, crate::config::DEFAULT_FONT_SIZE);
        assert!(text.auto_fit);
        assert_eq!(text.align, Align::Left);
    }

    #[test]
    fn test_invalid_style() {
        assert!(matches!(
            element(json!({"align": "diagonal"})),
            Err(ElementError::InvalidStyle { .. })
        ));
        assert!(matches!(
            element(json!({"font_size": 0})),
            Err(ElementError::InvalidStyle { .. })
        ));
        assert!(matches!(
            element(json!({"font_path": "/nonexistent.ttf"})),
            Err(ElementError::InvalidStyle { .. })
        ));
    }

    #[test]
    fn test_alignment_moves_text() {
        let left = draw(&element(json!({"font_size": 24})).unwrap(), BoundValue::Text("AB".into()));
        let right = draw(
            &element(json!({"font_size": 24, "align": "right"})).unwrap(),
            BoundValue::Text("AB".into()),
        );
        assert!(left_edge(&left).unwrap() < 10);
        assert!(left_edge(&right).unwrap() >= 176);
    }

    #[test]
    fn test_oversized_font_size_is_capped() {
        let text = element(json!({"font_size": u32::MAX})).unwrap();
        assert_eq!(text.font_size, MAX_FONT_SIZE);
        assert!(draw(&text, BoundValue::Text("Huge".into())).ink() > 0);

        let fixed = element(json!({"font_size": u32::MAX, "auto_fit": false})).unwrap();
        draw(&fixed, BoundValue::Text("Huge\nText".into()));
    }

    #[test]
    fn test_empty_value_uses_fallback_text() {
        let plain = element(json!({"font_size": 24})).unwrap();
        assert_eq!(draw(&plain, BoundValue::Empty).ink(), 0);

        let with_fallback = element(json!({"font_size": 24, "text": "N/A"})).unwrap();
        assert!(draw(&with_fallback, BoundValue::Empty).ink() > 0);
    }

    #[test]
    fn test_binary_value_is_rejected() {
        let text = element(json!({})).unwrap();
        let geometry = Geometry { x: 0, y: 0, width: 10, height: 10 };
        let mut canvas = Canvas::new(10, 10, Orientation::Standard).unwrap();
        assert!(
            text.render(&geometry, &BoundValue::Bytes(vec![1]), &mut canvas.region(0, 0, 10, 10))
                .is_err()
        );
    }
}
