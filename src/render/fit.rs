//! Auto-fit for text elements.
//!
//! Starting from the requested size, the font shrinks in steps until the
//! widest line fits the box width and all lines fit its height, or the
//! minimum size is reached. Lines still too wide are then cut and end in
//! `...`. The result depends only on the text, box, face and sizes.
//!
//! The starting size never exceeds the box height or [`MAX_FONT_SIZE`].

use crate::render::font::{MAX_FONT_SIZE, Typeface};

pub const DEFAULT_FIT_STEP: u32 = 2;
pub const DEFAULT_MIN_FONT_SIZE: u32 = 8;
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub step: u32,
    pub min_size: u32,
    pub bold: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            step: DEFAULT_FIT_STEP,
            min_size: DEFAULT_MIN_FONT_SIZE,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedText {
    pub size: u32,
    pub lines: Vec<String>,
}

pub fn fit_text(
    face: &Typeface,
    text: &str,
    width: u32,
    height: u32,
    start_size: u32,
    options: FitOptions,
) -> FittedText {
    let lines: Vec<&str> = text.lines().collect();
    let min_size = options.min_size.max(1);
    let step = options.step.max(1);
    let mut size = start_size.min(height).min(MAX_FONT_SIZE).max(min_size);
    let line_count = u32::try_from(lines.len()).unwrap_or(u32::MAX);

    loop {
        let widest = lines
            .iter()
            .map(|line| face.measure(line, size, options.bold))
            .max()
            .unwrap_or(0);
        let total_height = face.line_height(size).saturating_mul(line_count);
        if (widest <= width && total_height <= height) || size <= min_size {
            break;
        }
        size = size.saturating_sub(step).max(min_size);
    }

    let lines = lines
        .into_iter()
        .map(|line| truncate_line(face, line, width, size, options.bold))
        .collect();
    FittedText { size, lines }
}

/// Cut `line` so that it and a trailing ellipsis fit in `width`.
fn truncate_line(face: &Typeface, line: &str, width: u32, size: u32, bold: bool) -> String {
    if face.measure(line, size, bold) <= width {
        return line.to_string();
    }

    let chars: Vec<char> = line.chars().collect();
    for keep in (0..chars.len()).rev() {
        let candidate: String = chars[..keep].iter().collect::<String>() + ELLIPSIS;
        if face.measure(&candidate, size, bold) <= width {
            return candidate;
        }
    }
    String::new()
}
