//! Text rasterization.
//!
//! Two faces are available:
//!
//! - the built-in Spleen bitmap family, scaled nearest-neighbour to the
//!   requested pixel height (glyphs are half as wide as they are tall);
//! - any TrueType/OpenType file loaded through `ab_glyph`, thresholded at
//!   half coverage.
//!
//! Bold draws every glyph twice, one pixel apart.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use ab_glyph::{Font, FontArc, ScaleFont};
use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

use crate::error::EtiquetaError;
use crate::render::canvas::Region;

#[derive(Clone, Default)]
pub enum Typeface {
    #[default]
    Bitmap,
    TrueType(FontArc),
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typeface::Bitmap => f.write_str("Bitmap"),
            Typeface::TrueType(_) => f.write_str("TrueType"),
        }
    }
}

fn loaded_fonts() -> &'static Mutex<HashMap<PathBuf, FontArc>> {
    static FONTS: OnceLock<Mutex<HashMap<PathBuf, FontArc>>> = OnceLock::new();
    FONTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Largest font size a text element may ask for, in pixels.
pub const MAX_FONT_SIZE: u32 = 1000;

impl Typeface {
    /// Load a font file, reusing faces already loaded from the same path.
    pub fn load(path: &Path) -> Result<Self, EtiquetaError> {
        let mut fonts = loaded_fonts().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(font) = fonts.get(path) {
            return Ok(Typeface::TrueType(font.clone()));
        }

        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            EtiquetaError::Image(format!("cannot load font {}: {}", path.display(), e))
        })?;
        fonts.insert(path.to_path_buf(), font.clone());
        tracing::debug!(path = %path.display(), "loaded font");
        Ok(Typeface::TrueType(font))
    }

    pub fn line_height(&self, size: u32) -> u32 {
        match self {
            Typeface::Bitmap => size.max(1),
            Typeface::TrueType(font) => {
                let scaled = font.as_scaled(size as f32);
                ((scaled.ascent() - scaled.descent()).ceil() as u32).max(1)
            }
        }
    }

    /// Rendered width of one line in pixels.
    pub fn measure(&self, text: &str, size: u32, bold: bool) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let width = match self {
            Typeface::Bitmap => {
                let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
                bitmap_char_width(size).saturating_mul(chars)
            }
            Typeface::TrueType(font) => {
                let scaled = font.as_scaled(size as f32);
                let advance: f32 = text.chars().map(|ch| scaled.h_advance(font.glyph_id(ch))).sum();
                advance.ceil() as u32
            }
        };
        width.saturating_add(u32::from(bold))
    }

    /// Draw one line with its top-left corner at (x, y).
    pub fn draw(&self, region: &mut Region<'_>, x: i32, y: i32, text: &str, size: u32, bold: bool) {
        let passes: &[i32] = if bold { &[0, 1] } else { &[0] };
        for &dx in passes {
            match self {
                Typeface::Bitmap => draw_bitmap(region, x + dx, y, text, size),
                Typeface::TrueType(font) => draw_truetype(font, region, x + dx, y, text, size),
            }
        }
    }
}

fn bitmap_char_width(size: u32) -> u32 {
    (size / 2).max(1)
}

/// Source glyph as a row-major on/off grid, or `None` if the font lacks it.
fn spleen_glyph(ch: char, size: u32) -> Option<(Vec<bool>, usize, usize)> {
    let (data, w, h): (&[u8], usize, usize) = match size {
        0..=12 => (FONT_6X12, 6, 12),
        13..=16 => (FONT_8X16, 8, 16),
        _ => (FONT_12X24, 12, 24),
    };
    let mut font = PSF2Font::new(data).ok()?;
    let utf8 = ch.to_string();
    let glyph = font.glyph_for_utf8(utf8.as_bytes())?;

    let mut bits = vec![false; w * h];
    for (row_y, row) in glyph.enumerate() {
        for (col_x, on) in row.enumerate() {
            if row_y < h && col_x < w {
                bits[row_y * w + col_x] = on;
            }
        }
    }
    Some((bits, w, h))
}

fn draw_bitmap(region: &mut Region<'_>, x: i32, y: i32, text: &str, size: u32) {
    let dst_w = bitmap_char_width(size) as usize;
    let dst_h = size.max(1) as usize;

    for (i, ch) in text.chars().enumerate() {
        let origin_x = i64::from(x) + (i * dst_w) as i64;
        if origin_x >= i64::from(region.width()) {
            break;
        }
        let origin_x = origin_x as i32;
        if ch == ' ' {
            continue;
        }
        match spleen_glyph(ch, size) {
            Some((bits, src_w, src_h)) => {
                for dy in 0..dst_h {
                    for dx in 0..dst_w {
                        let sx = dx * src_w / dst_w;
                        let sy = dy * src_h / dst_h;
                        if bits[sy * src_w + sx] {
                            region.set(origin_x + dx as i32, y + dy as i32);
                        }
                    }
                }
            }
            // unknown glyph: box
            None => region.stroke_rect(origin_x, y, dst_w as u32, dst_h as u32, 1),
        }
    }
}

fn draw_truetype(font: &FontArc, region: &mut Region<'_>, x: i32, y: i32, text: &str, size: u32) {
    let pixel_height = size as f32;
    let scaled = font.as_scaled(pixel_height);
    let baseline_y = scaled.ascent();
    let mut caret_x = 0.0f32;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(pixel_height, ab_glyph::point(caret_x, baseline_y));
        caret_x += scaled.h_advance(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                if coverage >= 0.5 {
                    region.set(
                        x + px as i32 + bounds.min.x as i32,
                        y + py as i32 + bounds.min.y as i32,
                    );
                }
            });
        }
    }
}
