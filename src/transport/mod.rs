//! # Print Service Transports
//!
//! Implementations of [`MetadataSource`](crate::printer::MetadataSource)
//! and [`JobSubmitter`](crate::printer::JobSubmitter).
//!
//! ## Available Transports
//!
//! - [`cups`]: CUPS command-line clients (`lpstat`, `lpoptions`, `lp`)
//! - [`memory`]: scripted in-memory service for tests and offline use

pub mod cups;
pub mod memory;

pub use cups::CupsCli;
pub use memory::{MemoryPrinters, MemorySubmitter};
