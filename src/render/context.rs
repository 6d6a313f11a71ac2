//! Render context: everything one label request resolved before drawing.
//!
//! Built once per request and owned by the composition pipeline for the
//! duration of that request. Elements see the request data through their
//! bound value only.

use std::sync::Arc;

use crate::binding::RequestData;
use crate::config::{DEFAULT_FONT_SIZE, LabelOffset, Orientation};
use crate::printer::{MediaSize, PrinterProfile};

#[derive(Debug, Clone)]
pub struct RenderContext {
    pub profile: Arc<PrinterProfile>,
    pub media: MediaSize,
    pub orientation: Orientation,
    pub dpi: u32,
    pub data: RequestData,
    /// Font size for text elements that set none.
    pub default_font_size: u32,
    /// Canvas growth and content shift for the direct print workflow.
    pub offset: Option<LabelOffset>,
}

impl RenderContext {
    pub fn new(profile: Arc<PrinterProfile>, media: MediaSize, data: RequestData) -> Self {
        let dpi = profile.dpi;
        Self {
            profile,
            media,
            orientation: Orientation::Standard,
            dpi,
            data,
            default_font_size: DEFAULT_FONT_SIZE,
            offset: None,
        }
    }

    pub fn with_default_font_size(mut self, size: u32) -> Self {
        self.default_font_size = size;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_offset(mut self, offset: Option<LabelOffset>) -> Self {
        self.offset = offset.filter(|o| o.enabled);
        self
    }

    /// Offset in pixels, zero when disabled.
    pub fn offset_pixels(&self) -> (u32, u32) {
        self.offset
            .as_ref()
            .map(|o| (o.offset_x, o.offset_y))
            .unwrap_or((0, 0))
    }
}
