//! # Error Types
//!
//! Error types used throughout etiqueta.
//!
//! | Type | Scope | Effect |
//! |------|-------|--------|
//! | [`EtiquetaError`] | request | aborts the request |
//! | [`ElementError`] | one element | recorded, the label still renders |
//! | [`BindingError`] | one binding | wrapped into an [`ElementError`] |
//! | [`SubmissionError`] | one copy | recorded in the job report |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// The printing service could not be reached or answered garbage.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The request cannot be satisfied with the current configuration.
    #[error("Configuration error [{code}]: {message}")]
    Configuration {
        code: ConfigErrorCode,
        message: String,
    },

    /// Job submission failed before any copy was accepted
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// A request parameter could not be interpreted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Service settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtiquetaError {
    pub fn config(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        EtiquetaError::Configuration {
            code,
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            EtiquetaError::Connectivity(_) => "connectivity",
            EtiquetaError::Configuration { code, .. } => code.as_str(),
            EtiquetaError::Submission(_) => "submission",
            EtiquetaError::InvalidRequest(_) => "invalid_request",
            EtiquetaError::Image(_) => "image",
            EtiquetaError::Settings(_) => "settings",
            EtiquetaError::Io(_) => "io",
        }
    }
}

/// Descriptive code carried by [`EtiquetaError::Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// No media size could be chosen.
    EmptyCatalog,
    /// No printer could be chosen.
    NoPrinters,
    /// A size key or dimension pair could not be interpreted.
    MalformedSize,
    /// The label configuration file is unreadable or invalid.
    InvalidConfig,
    /// The requested template does not exist.
    TemplateNotFound,
    /// The template could not be parsed.
    InvalidTemplate,
    /// The resolved canvas has a zero dimension.
    EmptyCanvas,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::EmptyCatalog => "empty_catalog",
            ConfigErrorCode::NoPrinters => "no_printers",
            ConfigErrorCode::MalformedSize => "malformed_size",
            ConfigErrorCode::InvalidConfig => "invalid_config",
            ConfigErrorCode::TemplateNotFound => "template_not_found",
            ConfigErrorCode::InvalidTemplate => "invalid_template",
            ConfigErrorCode::EmptyCanvas => "empty_canvas",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single element. Never aborts the label.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElementError {
    #[error("unknown element type '{0}'")]
    UnknownType(String),

    #[error("invalid style for '{element_type}': {message}")]
    InvalidStyle {
        element_type: String,
        message: String,
    },

    #[error("binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("render failed: {0}")]
    Render(String),
}

/// Failure to obtain an element's value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindingError {
    #[error("expected {expected} payload, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no value for key '{0}' and no default")]
    MissingKey(String),

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Connectivity { url: String, message: String },

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("path '{0}' not found in response")]
    PathNotFound(String),

    #[error("value at '{0}' is not a scalar")]
    NotScalar(String),
}

/// Failure of one submission attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmissionError {
    #[error("job rejected: {0}")]
    Rejected(String),

    #[error("printer out of media: {0}")]
    OutOfMedia(String),

    #[error("spooler unreachable: {0}")]
    Unreachable(String),

    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
}

impl SubmissionError {
    /// Hard failures stop the remaining copies of a job.
    pub fn is_hard(&self) -> bool {
        !matches!(self, SubmissionError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display_carries_code() {
        let err = EtiquetaError::config(ConfigErrorCode::NoPrinters, "nothing found");
        assert_eq!(err.code(), "no_printers");
        assert_eq!(
            err.to_string(),
            "Configuration error [no_printers]: nothing found"
        );
    }

    #[test]
    fn test_submission_error_severity() {
        assert!(SubmissionError::Rejected("x".into()).is_hard());
        assert!(SubmissionError::Unreachable("x".into()).is_hard());
        assert!(!SubmissionError::Timeout(Duration::from_secs(1)).is_hard());
    }

    #[test]
    fn test_binding_error_wraps_into_element_error() {
        let err: ElementError = BindingError::MissingKey("name".into()).into();
        assert_eq!(
            err.to_string(),
            "binding failed: no value for key 'name' and no default"
        );
    }
}
