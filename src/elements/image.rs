//! Image element.
//!
//! Accepts raw bytes (a `download` binding) or text holding base64, with or
//! without a `data:image/...;base64,` prefix. The decoded image is scaled
//! into the box (`fit`: `contain` keeps the aspect ratio and centres,
//! `stretch` fills the box) and binarized with `dither` (`threshold` or
//! `bayer`).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;

use super::text::Align;
use super::{Element, Geometry, Style};
use crate::binding::BoundValue;
use crate::error::ElementError;
use crate::render::dither::{DitherMode, intensity};
use crate::render::Region;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFit {
    #[default]
    Contain,
    Stretch,
}

#[derive(Debug, Clone)]
pub struct ImageElement {
    pub fit: ImageFit,
    pub dither: DitherMode,
}

impl ImageElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        let fit = match style.str("fit")? {
            None => ImageFit::default(),
            Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                "contain" => ImageFit::Contain,
                "stretch" | "fill" => ImageFit::Stretch,
                _ => return Err(style.invalid(format!("unknown fit '{}'", s))),
            },
        };
        let dither = match style.str("dither")? {
            None => DitherMode::default(),
            Some(s) => DitherMode::parse(s).ok_or_else(|| style.invalid(format!("unknown dither '{}'", s)))?,
        };
        Ok(Self { fit, dither })
    }
}

/// Decode base64 text, dropping any data-URI prefix.
fn decode_base64(text: &str) -> Result<Vec<u8>, ElementError> {
    let payload = match text.split_once(";base64,") {
        Some((_, data)) => data,
        None => text,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ElementError::Render(format!("invalid base64 image: {}", e)))
}

impl Element for ImageElement {
    fn render(
        &self,
        geometry: &Geometry,
        value: &BoundValue,
        region: &mut Region<'_>,
    ) -> Result<(), ElementError> {
        let bytes = match value {
            BoundValue::Empty => return Ok(()),
            BoundValue::Bytes(bytes) => bytes.clone(),
            BoundValue::Text(text) if text.trim().is_empty() => return Ok(()),
            BoundValue::Text(text) => decode_base64(text)?,
        };
        if geometry.width == 0 || geometry.height == 0 {
            return Ok(());
        }

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| ElementError::Render(format!("cannot decode image: {}", e)))?;
        let scaled = match self.fit {
            ImageFit::Stretch => {
                decoded.resize_exact(geometry.width, geometry.height, FilterType::Triangle)
            }
            ImageFit::Contain => decoded.resize(geometry.width, geometry.height, FilterType::Triangle),
        };
        let gray = scaled.to_luma8();
        let left = Align::Center.offset(geometry.width, gray.width());
        let top = Align::Center.offset(geometry.height, gray.height());

        for (x, y, pixel) in gray.enumerate_pixels() {
            if self.dither.is_ink(x as usize, y as usize, intensity(pixel.0[0])) {
                region.set(left + x as i32, top + y as i32);
            }
        }
        Ok(())
    }
}
