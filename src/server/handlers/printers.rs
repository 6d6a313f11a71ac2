//! Printer and media API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::EtiquetaError;
use crate::printer::MediaSize;

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct PrinterList {
    pub printers: Vec<String>,
    /// The printer a request without `printer` would use.
    pub default: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrinterMedia {
    pub printer: String,
    pub dpi: u32,
    pub metadata_available: bool,
    /// Size a request without `label_size` would use.
    pub default_size: Option<String>,
    pub sizes: Vec<MediaSize>,
    pub warnings: Vec<String>,
}

/// GET /api/printers - List printers after include/exclude filters.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<PrinterList> {
    let printers = state.service.printers().await;
    let default = state.service.resolver().resolve_printer(None).await.ok();
    Json(PrinterList { printers, default })
}

/// GET /api/printer/:name/media - Merged media catalog of one printer.
pub async fn media(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PrinterMedia>, EtiquetaError> {
    let profile = state.service.resolve_printer(Some(&name)).await?;
    let default_size = state
        .service
        .resolve_media_size(&profile, None)
        .await
        .ok()
        .map(|size| size.key);

    Ok(Json(PrinterMedia {
        printer: profile.name.clone(),
        dpi: profile.dpi,
        metadata_available: profile.metadata_available,
        default_size,
        sizes: profile.available_sizes().into_iter().cloned().collect(),
        warnings: profile.warnings.clone(),
    }))
}
