//! # Label Canvas
//!
//! A white grayscale bitmap with the media's physical dimensions. Elements
//! draw in *logical* coordinates:
//!
//! ```text
//! Standard                Rotated (90° clockwise)
//! logical == physical     logical W x H = physical H x W
//!
//! (lx, ly) -> (lx, ly)    (lx, ly) -> (W_phys - 1 - ly, lx)
//! ```
//!
//! With a label offset the physical bitmap grows by the offset and all
//! content shifts right/down by the same amount.
//!
//! A bitmap may be at most [`MAX_CANVAS_SIDE`] pixels on a side and
//! [`MAX_CANVAS_PIXELS`] pixels in total; larger sizes are malformed.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};

use crate::config::Orientation;
use crate::error::{ConfigErrorCode, EtiquetaError};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// Longest bitmap side in pixels (about 4 m of media at 203 dpi).
pub const MAX_CANVAS_SIDE: u32 = 32_768;

/// Largest bitmap area in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Whether a `width` x `height` bitmap may be allocated.
pub fn within_canvas_limits((width, height): (u32, u32)) -> bool {
    width <= MAX_CANVAS_SIDE
        && height <= MAX_CANVAS_SIDE
        && u64::from(width) * u64::from(height) <= MAX_CANVAS_PIXELS
}

#[derive(Debug, Clone)]
pub struct Canvas {
    image: GrayImage,
    /// Logical width and height.
    width: u32,
    height: u32,
    /// Physical width of the content area, without offset.
    content_width: u32,
    orientation: Orientation,
    offset: (u32, u32),
}

impl Canvas {
    /// Blank canvas for media of `width` x `height` physical pixels.
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Result<Self, EtiquetaError> {
        Self::with_offset(width, height, orientation, (0, 0))
    }

    pub fn with_offset(
        width: u32,
        height: u32,
        orientation: Orientation,
        offset: (u32, u32),
    ) -> Result<Self, EtiquetaError> {
        if width == 0 || height == 0 {
            return Err(EtiquetaError::config(
                ConfigErrorCode::EmptyCanvas,
                format!("canvas {}x{} has no area", width, height),
            ));
        }

        let (logical_w, logical_h) = match orientation {
            Orientation::Standard => (width, height),
            Orientation::Rotated => (height, width),
        };
        let physical = width
            .checked_add(offset.0)
            .zip(height.checked_add(offset.1))
            .filter(|dims| within_canvas_limits(*dims))
            .ok_or_else(|| {
                EtiquetaError::config(
                    ConfigErrorCode::MalformedSize,
                    format!(
                        "canvas {}x{} with offset {}x{} exceeds {}x{} px",
                        width, height, offset.0, offset.1, MAX_CANVAS_SIDE, MAX_CANVAS_SIDE
                    ),
                )
            })?;
        let image = GrayImage::from_pixel(physical.0, physical.1, PAPER);

        Ok(Self {
            image,
            width: logical_w,
            height: logical_h,
            content_width: width,
            orientation,
            offset,
        })
    }

    /// Logical width, after orientation.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Dimensions of the output bitmap.
    pub fn physical_dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn physical(&self, x: u32, y: u32) -> (u32, u32) {
        let (px, py) = match self.orientation {
            Orientation::Standard => (x, y),
            Orientation::Rotated => (self.content_width - 1 - y, x),
        };
        (px + self.offset.0, py + self.offset.1)
    }

    /// Ink one logical pixel; coordinates outside the canvas are ignored.
    pub fn set(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let (px, py) = self.physical(x as u32, y as u32);
        self.image.put_pixel(px, py, INK);
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (px, py) = self.physical(x, y);
        self.image.get_pixel(px, py) == &INK
    }

    /// Number of inked pixels.
    pub fn ink(&self) -> usize {
        self.image.pixels().filter(|p| **p == INK).count()
    }

    /// Drawing surface clipped to an element's box.
    pub fn region(&mut self, x: i32, y: i32, width: u32, height: u32) -> Region<'_> {
        Region {
            canvas: self,
            x,
            y,
            width,
            height,
        }
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// Encode a bitmap as PNG.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, EtiquetaError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| EtiquetaError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(png)
}

/// An element's view of the canvas. Coordinates are relative to the
/// element's origin; anything outside its box is dropped.
pub struct Region<'a> {
    canvas: &'a mut Canvas,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Region<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        self.canvas
            .set(self.x as i64 + x as i64, self.y as i64 + y as i64);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        // only the part inside the region is visited
        let clip = |start: i32, len: u32, limit: u32| {
            let from = i64::from(start).max(0);
            let to = (i64::from(start) + i64::from(len)).min(i64::from(limit));
            from as i32..to.max(from) as i32
        };
        for py in clip(y, height, self.height) {
            for px in clip(x, width, self.width) {
                self.set(px, py);
            }
        }
    }

    /// Rectangle outline `thickness` pixels wide.
    pub fn stroke_rect(&mut self, x: i32, y: i32, width: u32, height: u32, thickness: u32) {
        let t = thickness.min(width / 2 + 1).min(height / 2 + 1).max(1);
        let far = |start: i32, len: u32| {
            (i64::from(start) + i64::from(len) - i64::from(t)).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        self.fill_rect(x, y, width, t);
        self.fill_rect(x, far(y, height), width, t);
        self.fill_rect(x, y, t, height);
        self.fill_rect(far(x, width), y, t, height);
    }
}
