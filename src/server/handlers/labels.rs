//! Label preview and print handlers.
//!
//! Template endpoints take the template file from the path; text endpoints
//! take `text`, `font_size` and `align` from the query (or `text` from a
//! JSON body).

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;

use crate::binding::Payload;
use crate::compose::ElementFailure;
use crate::config::Orientation;
use crate::error::EtiquetaError;
use crate::printer::MediaSize;
use crate::service::{PrintOptions, PrintOutcome, RenderedLabel, TextLabel};

use super::super::state::AppState;
use super::ParsedQuery;

const PREVIEW_OPTIONS: &[&str] = &["return_format"];
const PRINT_OPTIONS: &[&str] = &["quantity", "strict"];
const TEXT_OPTIONS: &[&str] = &["text", "font_size", "align", "return_format", "quantity", "strict"];

/// Response header carrying the number of failed elements of a PNG preview.
pub const ELEMENT_ERRORS_HEADER: &str = "x-element-errors";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ReturnFormat {
    #[default]
    Png,
    Base64,
    Json,
}

impl ReturnFormat {
    fn parse(query: &ParsedQuery) -> Result<Self, EtiquetaError> {
        match query.option("return_format").map(str::to_ascii_lowercase).as_deref() {
            None | Some("png") => Ok(ReturnFormat::Png),
            Some("base64") => Ok(ReturnFormat::Base64),
            Some("json") => Ok(ReturnFormat::Json),
            Some(other) => Err(EtiquetaError::InvalidRequest(format!(
                "return_format must be png, base64 or json, got '{}'",
                other
            ))),
        }
    }
}

/// JSON preview body.
#[derive(Debug, Serialize)]
pub struct PreviewBody {
    pub printer: String,
    pub media: MediaSize,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
    /// Base64 PNG.
    pub image: String,
    pub errors: Vec<ElementFailure>,
}

fn preview_response(rendered: RenderedLabel, format: ReturnFormat) -> Result<Response, EtiquetaError> {
    let png = rendered.label.to_png()?;
    let errors = rendered.label.failures();

    let response = match format {
        ReturnFormat::Png => {
            let mut response = ([(header::CONTENT_TYPE, "image/png")], png).into_response();
            response
                .headers_mut()
                .insert(ELEMENT_ERRORS_HEADER, errors.len().into());
            response
        }
        ReturnFormat::Base64 => {
            ([(header::CONTENT_TYPE, "text/plain")], STANDARD.encode(&png)).into_response()
        }
        ReturnFormat::Json => {
            let (width, height) = rendered.label.dimensions();
            Json(PreviewBody {
                printer: rendered.profile.name.clone(),
                media: rendered.media,
                orientation: rendered.orientation,
                width,
                height,
                image: STANDARD.encode(&png),
                errors,
            })
            .into_response()
        }
    };
    Ok(response)
}

fn print_options(query: &ParsedQuery) -> Result<PrintOptions, EtiquetaError> {
    Ok(PrintOptions {
        quantity: query.u32_option("quantity")?.unwrap_or(1).max(1),
        strict: query.bool_option("strict"),
    })
}

/// 200 when every copy went out, 422 when a strict request was refused,
/// 502 when nothing was printed, 207 for partial success.
fn print_response(outcome: PrintOutcome) -> Response {
    let status = match &outcome.report {
        None => StatusCode::UNPROCESSABLE_ENTITY,
        Some(report) if report.is_complete() => StatusCode::OK,
        Some(report) if report.succeeded == 0 => StatusCode::BAD_GATEWAY,
        Some(_) => StatusCode::MULTI_STATUS,
    };
    (status, Json(outcome)).into_response()
}

fn text_label(query: &ParsedQuery) -> Result<TextLabel, EtiquetaError> {
    let text = match query.option("text") {
        Some(text) => text.to_string(),
        None => query
            .request
            .data
            .payload
            .get("text")
            .ok()
            .flatten()
            .and_then(|p| match p {
                Payload::Scalar(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_default(),
    };
    Ok(TextLabel {
        text,
        font_size: query.u32_option("font_size")?,
        align: query.option("align").map(str::to_string),
    })
}

/// POST /api/preview/template/:file
pub async fn preview_template(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, EtiquetaError> {
    let query = ParsedQuery::parse(params, PREVIEW_OPTIONS, &body)?;
    let format = ReturnFormat::parse(&query)?;
    let template = state.service.templates().load(&file)?;
    let rendered = state.service.compose_label(&template, &query.request).await?;
    preview_response(rendered, format)
}

/// POST /api/print/template/:file
pub async fn print_template(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, EtiquetaError> {
    let query = ParsedQuery::parse(params, PRINT_OPTIONS, &body)?;
    let options = print_options(&query)?;
    let template = state.service.templates().load(&file)?;
    let outcome = state.service.print(&template, &query.request, options).await?;
    Ok(print_response(outcome))
}

/// POST /api/preview/text
pub async fn preview_text(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, EtiquetaError> {
    let query = ParsedQuery::parse(params, TEXT_OPTIONS, &body)?;
    let format = ReturnFormat::parse(&query)?;
    let text = text_label(&query)?;
    let rendered = state.service.compose_text(&text, &query.request).await?;
    preview_response(rendered, format)
}

/// POST /api/print/text
pub async fn print_text(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, EtiquetaError> {
    let query = ParsedQuery::parse(params, TEXT_OPTIONS, &body)?;
    let options = print_options(&query)?;
    let text = text_label(&query)?;
    let outcome = state.service.print_text(&text, &query.request, options).await?;
    Ok(print_response(outcome))
}
