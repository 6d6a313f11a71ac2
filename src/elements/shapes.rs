//! Rectangles and rules. Both ignore their bound value.

use super::{Element, Geometry, Style};
use crate::binding::BoundValue;
use crate::error::ElementError;
use crate::render::Region;

const DEFAULT_THICKNESS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectElement {
    pub filled: bool,
    pub thickness: u32,
}

impl RectElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        Ok(Self {
            filled: style.bool("fill")?.unwrap_or(false),
            thickness: style.u32("thickness")?.unwrap_or(DEFAULT_THICKNESS).max(1),
        })
    }
}

impl Element for RectElement {
    fn render(&self, geometry: &Geometry, _: &BoundValue, region: &mut Region<'_>) -> Result<(), ElementError> {
        if self.filled {
            region.fill_rect(0, 0, geometry.width, geometry.height);
        } else {
            region.stroke_rect(0, 0, geometry.width, geometry.height, self.thickness);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineElement {
    pub vertical: bool,
    pub thickness: u32,
}

impl LineElement {
    pub fn from_style(style: &Style<'_>) -> Result<Self, ElementError> {
        let vertical = match style.str("direction")? {
            None => false,
            Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                "horizontal" => false,
                "vertical" => true,
                _ => return Err(style.invalid(format!("unknown direction '{}'", s))),
            },
        };
        Ok(Self {
            vertical,
            thickness: style.u32("thickness")?.unwrap_or(DEFAULT_THICKNESS).max(1),
        })
    }
}

impl Element for LineElement {
    fn render(&self, geometry: &Geometry, _: &BoundValue, region: &mut Region<'_>) -> Result<(), ElementError> {
        if self.vertical {
            region.fill_rect(0, 0, self.thickness, geometry.height);
        } else {
            region.fill_rect(0, 0, geometry.width, self.thickness);
        }
        Ok(())
    }
}
