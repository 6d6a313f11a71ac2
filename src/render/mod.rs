//! # Rendering Module
//!
//! Drawing primitives shared by the element plugins.
//!
//! ## Modules
//!
//! - [`canvas`]: label bitmap with orientation mapping and clipped regions
//! - [`context`]: per-request render context
//! - [`dither`]: threshold and Bayer 8x8 binarization
//! - [`fit`]: text auto-fit (shrink, then truncate)
//! - [`font`]: Spleen bitmap and TrueType faces

pub mod canvas;
pub mod context;
pub mod dither;
pub mod fit;
pub mod font;

pub use canvas::{Canvas, Region, encode_png};
pub use context::RenderContext;
pub use dither::DitherMode;
pub use fit::{FitOptions, FittedText, fit_text};
pub use font::{MAX_FONT_SIZE, Typeface};
