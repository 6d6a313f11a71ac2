//! # Printer Module
//!
//! Collaborator interfaces for the print service and the data types
//! describing a printer.
//!
//! ## Modules
//!
//! - [`source`]: metadata queries and job submission traits
//! - [`profile`]: media sizes and merged printer profiles

pub mod profile;
pub mod source;

pub use profile::{MediaSize, PrinterProfile, SizeSource};
pub use source::{JobId, JobSubmitter, MetadataSource, PrinterAttributes, SubmitRequest};
