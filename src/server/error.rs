//! HTTP mapping of [`EtiquetaError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{ConfigErrorCode, EtiquetaError};

/// Status code for an error that aborted a request.
pub fn status_for(error: &EtiquetaError) -> StatusCode {
    match error {
        EtiquetaError::Configuration { code, .. } => match code {
            ConfigErrorCode::TemplateNotFound => StatusCode::NOT_FOUND,
            ConfigErrorCode::InvalidTemplate
            | ConfigErrorCode::MalformedSize
            | ConfigErrorCode::EmptyCanvas => StatusCode::BAD_REQUEST,
            ConfigErrorCode::EmptyCatalog | ConfigErrorCode::NoPrinters => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ConfigErrorCode::InvalidConfig => StatusCode::INTERNAL_SERVER_ERROR,
        },
        EtiquetaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        EtiquetaError::Connectivity(_) | EtiquetaError::Submission(_) => StatusCode::BAD_GATEWAY,
        EtiquetaError::Image(_) | EtiquetaError::Settings(_) | EtiquetaError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for EtiquetaError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
