//! # Print Job Assembly
//!
//! Submits a finished label `quantity` times.
//!
//! - A submitter with native copies gets one submission with
//!   `copies = quantity`.
//! - Otherwise each copy is its own single-copy submission. A hard failure
//!   (rejected, out of media, spooler unreachable) stops the remaining
//!   copies; a timeout is recorded and the next copy is still attempted.
//!
//! Every failed attempt ends up in the [`JobReport`].

use std::sync::Arc;

use serde::Serialize;

use crate::error::SubmissionError;
use crate::printer::{JobId, JobSubmitter, SubmitRequest};

/// A composed label ready to submit.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub printer: String,
    /// PNG bytes.
    pub document: Vec<u8>,
    /// Media option, `None` to let the printer decide.
    pub media: Option<String>,
    pub quantity: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    pub error: String,
    pub hard: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobReport {
    pub requested: u32,
    pub succeeded: u32,
    pub job_ids: Vec<JobId>,
    pub failures: Vec<AttemptFailure>,
    /// Why submission stopped before all copies were attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<String>,
}

impl JobReport {
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.requested
    }

    fn record(&mut self, attempt: u32, error: &SubmissionError) {
        self.failures.push(AttemptFailure {
            attempt,
            error: error.to_string(),
            hard: error.is_hard(),
        });
    }
}

#[derive(Clone)]
pub struct JobAssembler {
    submitter: Arc<dyn JobSubmitter>,
}

impl JobAssembler {
    pub fn new(submitter: Arc<dyn JobSubmitter>) -> Self {
        Self { submitter }
    }

    pub async fn submit(&self, job: &PrintJob) -> JobReport {
        let quantity = job.quantity.max(1);
        let mut report = JobReport {
            requested: quantity,
            ..JobReport::default()
        };
        let request = |copies: u32| SubmitRequest {
            printer: job.printer.clone(),
            document: job.document.clone(),
            media: job.media.clone(),
            copies,
            title: job.title.clone(),
        };

        if self.submitter.supports_native_copies() {
            match self.submitter.submit(&request(quantity)).await {
                Ok(id) => {
                    report.succeeded = quantity;
                    report.job_ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(printer = %job.printer, error = %e, "submission failed");
                    report.record(1, &e);
                }
            }
            return report;
        }

        for attempt in 1..=quantity {
            match self.submitter.submit(&request(1)).await {
                Ok(id) => {
                    report.succeeded += 1;
                    report.job_ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(printer = %job.printer, attempt, error = %e, "copy failed");
                    report.record(attempt, &e);
                    if e.is_hard() {
                        report.stopped = Some(format!(
                            "stopped after attempt {} of {}: {}",
                            attempt, quantity, e
                        ));
                        break;
                    }
                }
            }
        }

        tracing::info!(
            printer = %job.printer,
            requested = report.requested,
            succeeded = report.succeeded,
            "job finished"
        );
        report
    }
}
