//! # Print Service Interfaces
//!
//! The print service is an external collaborator reached through two
//! traits: [`MetadataSource`] for discovery and [`JobSubmitter`] for
//! spooling. Both are object-safe so a resolver can hold
//! `Arc<dyn MetadataSource>`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{EtiquetaError, SubmissionError};

/// Capabilities reported for one printer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrinterAttributes {
    /// Supported media keys, in service order.
    pub media_supported: Vec<String>,
    pub media_default: Option<String>,
    /// Exact media dimensions in hundredths of a millimetre, by media key.
    pub media_sizes: HashMap<String, (u32, u32)>,
    /// Default resolution in DPI.
    pub resolution_default: Option<u32>,
}

/// Printer and media discovery.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// All printers known to the service.
    async fn list_printers(&self) -> Result<Vec<String>, EtiquetaError>;

    /// The service-wide default printer, if any.
    async fn default_printer(&self) -> Result<Option<String>, EtiquetaError>;

    async fn printer_attributes(&self, printer: &str) -> Result<PrinterAttributes, EtiquetaError>;
}

/// Identifier assigned by the spooler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One submission to the spooler.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub printer: String,
    /// PNG-encoded label bitmap.
    pub document: Vec<u8>,
    /// Protocol media name; `None` prints the bitmap 1:1.
    pub media: Option<String>,
    pub copies: u32,
    pub title: String,
}

/// Job spooling.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Whether a single submission can carry a copy count.
    fn supports_native_copies(&self) -> bool;

    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, SubmissionError>;
}
