//! # Binarization
//!
//! Labels print in pure black and white. Decoded images are reduced to ink
//! or paper per pixel, either with a fixed threshold or with 8x8 ordered
//! (Bayer) dithering:
//!
//! ```text
//! threshold(x, y) = (BAYER8[y mod 8][x mod 8] + 0.5) / 64
//! ink            <=> intensity > threshold
//! ```
//!
//! Intensity runs from 0.0 (white) to 1.0 (black).

use serde::{Deserialize, Serialize};

/// Bayer 8x8 dithering matrix
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DitherMode {
    /// Ink where intensity is above one half.
    #[default]
    Threshold,
    Bayer,
}

impl DitherMode {
    pub fn parse(s: &str) -> Option<DitherMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" | "none" => Some(DitherMode::Threshold),
            "bayer" | "ordered" => Some(DitherMode::Bayer),
            _ => None,
        }
    }

    #[inline]
    pub fn is_ink(self, x: usize, y: usize, intensity: f32) -> bool {
        match self {
            DitherMode::Threshold => intensity > 0.5,
            DitherMode::Bayer => intensity > threshold(x, y),
        }
    }
}

/// Never exactly 0 or 1, so white never prints and black always does.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Ink intensity of an 8-bit luma value.
#[inline]
pub fn intensity(luma: u8) -> f32 {
    1.0 - luma as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_range() {
        for y in 0..8 {
            for x in 0..8 {
                let t = threshold(x, y);
                assert!(t > 0.0 && t < 1.0);
            }
        }
    }

    #[test]
    fn test_extremes_are_stable() {
        for mode in [DitherMode::Threshold, DitherMode::Bayer] {
            assert!(mode.is_ink(3, 5, intensity(0)));
            assert!(!mode.is_ink(3, 5, intensity(255)));
        }
    }

    #[test]
    fn test_bayer_half_gray_prints_half() {
        let count = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter(|&(x, y)| DitherMode::Bayer.is_ink(x, y, 0.5))
            .count();
        assert_eq!(count, 32);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(DitherMode::parse("Bayer"), Some(DitherMode::Bayer));
        assert_eq!(DitherMode::parse("none"), Some(DitherMode::Threshold));
        assert_eq!(DitherMode::parse("floyd"), None);
    }
}
