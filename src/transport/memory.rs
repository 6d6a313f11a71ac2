//! # In-Memory Transport
//!
//! A scripted print service for tests and offline rendering.
//!
//! - [`MemoryPrinters`] answers metadata queries from a fixed table and can
//!   be made slow or unreachable.
//! - [`MemorySubmitter`] records every submission and replays a scripted
//!   list of outcomes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EtiquetaError, SubmissionError};
use crate::printer::{JobId, JobSubmitter, MetadataSource, PrinterAttributes, SubmitRequest};

#[derive(Debug, Clone, Default)]
pub struct MemoryPrinters {
    printers: Vec<(String, PrinterAttributes)>,
    default: Option<String>,
    delay: Option<Duration>,
    unreachable: bool,
}

impl MemoryPrinters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_printer(mut self, name: &str, attributes: PrinterAttributes) -> Self {
        self.printers.push((name.to_string(), attributes));
        self
    }

    pub fn with_default(mut self, name: &str) -> Self {
        self.default = Some(name.to_string());
        self
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every query with a connectivity error.
    pub fn failing(mut self) -> Self {
        self.unreachable = true;
        self
    }

    async fn answer(&self) -> Result<(), EtiquetaError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(EtiquetaError::Connectivity(
                "print service unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for MemoryPrinters {
    async fn list_printers(&self) -> Result<Vec<String>, EtiquetaError> {
        self.answer().await?;
        Ok(self.printers.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn default_printer(&self) -> Result<Option<String>, EtiquetaError> {
        self.answer().await?;
        Ok(self.default.clone())
    }

    async fn printer_attributes(&self, printer: &str) -> Result<PrinterAttributes, EtiquetaError> {
        self.answer().await?;
        self.printers
            .iter()
            .find(|(name, _)| name == printer)
            .map(|(_, attrs)| attrs.clone())
            .ok_or_else(|| EtiquetaError::Connectivity(format!("unknown printer '{}'", printer)))
    }
}

/// Records submissions instead of printing.
#[derive(Debug, Default)]
pub struct MemorySubmitter {
    native_copies: bool,
    outcomes: Mutex<VecDeque<Option<SubmissionError>>>,
    submitted: Mutex<Vec<SubmitRequest>>,
    next_id: AtomicU32,
}

impl MemorySubmitter {
    pub fn new(native_copies: bool) -> Self {
        Self {
            native_copies,
            ..Self::default()
        }
    }

    /// Script the next outcomes; `None` is a success. Unscripted
    /// submissions succeed.
    pub fn with_outcomes(self, outcomes: Vec<Option<SubmissionError>>) -> Self {
        *self.outcomes.lock().unwrap_or_else(|e| e.into_inner()) = outcomes.into();
        self
    }

    /// Every submission received, failed ones included.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl JobSubmitter for MemorySubmitter {
    fn supports_native_copies(&self) -> bool {
        self.native_copies
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, SubmissionError> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .flatten();
        match outcome {
            Some(err) => Err(err),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(JobId(format!("{}-{}", request.printer, id)))
            }
        }
    }
}
