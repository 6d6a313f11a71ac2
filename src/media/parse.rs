//! Size keys of the form `WxH{in,mm}`.
//!
//! The pattern is searched anywhere in the key, case-insensitively, so
//! service names such as `na_index-4x6_4x6in` and `Custom.62x29mm` parse.

use std::sync::OnceLock;

use regex::Regex;

static SIZE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn size_pattern() -> &'static Regex {
    SIZE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*x\s*(\d+(?:\.\d+)?)\s*(in|mm)")
            .expect("size pattern is a valid regex")
    })
}

/// Physical unit of a parsed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Inch,
    Millimetre,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Inch => "in",
            Unit::Millimetre => "mm",
        }
    }

    fn to_inches(self, value: f64) -> f64 {
        match self {
            Unit::Inch => value,
            Unit::Millimetre => value / 25.4,
        }
    }
}

/// Physical dimensions found in a size key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSize {
    pub width: f64,
    pub height: f64,
    pub unit: Unit,
    width_text: String,
    height_text: String,
}

impl ParsedSize {
    /// Pixel dimensions at `dpi`, rounded half-up.
    pub fn to_pixels(&self, dpi: u32) -> (u32, u32) {
        (
            round_px(self.unit.to_inches(self.width) * dpi as f64),
            round_px(self.unit.to_inches(self.height) * dpi as f64),
        )
    }

    /// Human-readable label, e.g. `4in x 6in`.
    pub fn label(&self) -> String {
        let unit = self.unit.suffix();
        format!("{}{} x {}{}", self.width_text, unit, self.height_text, unit)
    }
}

/// Find the first `WxH{in,mm}` occurrence in `key`.
pub fn parse_size_key(key: &str) -> Option<ParsedSize> {
    let caps = size_pattern().captures(key)?;
    let width_text = caps.get(1)?.as_str();
    let height_text = caps.get(2)?.as_str();
    let unit = match caps.get(3)?.as_str().to_ascii_lowercase().as_str() {
        "in" => Unit::Inch,
        _ => Unit::Millimetre,
    };
    Some(ParsedSize {
        width: width_text.parse().ok()?,
        height: height_text.parse().ok()?,
        unit,
        width_text: width_text.to_string(),
        height_text: height_text.to_string(),
    })
}

/// Display label for a media key: the parsed size, or the key itself.
pub fn display_label(key: &str) -> String {
    parse_size_key(key)
        .map(|parsed| parsed.label())
        .unwrap_or_else(|| key.to_string())
}

/// Convert hundredths of a millimetre to pixels.
pub fn hundredths_mm_to_pixels(value: u32, dpi: u32) -> u32 {
    round_px(value as f64 / 100.0 / 25.4 * dpi as f64)
}

/// Convert pixels to whole millimetres.
pub fn pixels_to_mm(value: u32, dpi: u32) -> u32 {
    if dpi == 0 {
        return 0;
    }
    round_px(value as f64 / dpi as f64 * 25.4)
}

fn round_px(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value + 0.5).floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inches_at_203_dpi() {
        let parsed = parse_size_key("4x6in").unwrap();
        assert_eq!(parsed.to_pixels(203), (812, 1218));
    }

    #[test]
    fn test_millimetres_at_203_dpi() {
        let parsed = parse_size_key("100x50mm").unwrap();
        assert_eq!(parsed.unit, Unit::Millimetre);
        assert_eq!(parsed.to_pixels(203), (799, 400));
    }

    #[test]
    fn test_pattern_is_searched_case_insensitively() {
        let parsed = parse_size_key("na_index-4x6_4X6IN").unwrap();
        assert_eq!(parsed.to_pixels(300), (1200, 1800));
        assert_eq!(parse_size_key("2.25 x 1.25 in").unwrap().to_pixels(203), (457, 254));
        assert!(parse_size_key("Letter").is_none());
        assert!(parse_size_key("62").is_none());
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("na_index-4x6_4x6in"), "4in x 6in");
        assert_eq!(display_label("iso_a4_210x297mm"), "210mm x 297mm");
        assert_eq!(display_label("Letter"), "Letter");
    }

    #[test]
    fn test_unit_conversions() {
        // 101.6mm = 4in
        assert_eq!(hundredths_mm_to_pixels(10160, 203), 812);
        assert_eq!(pixels_to_mm(812, 203), 102);
        assert_eq!(pixels_to_mm(457, 203), 57);
        assert_eq!(pixels_to_mm(10, 0), 0);
    }
}
