//! Health and configuration handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::EtiquetaError;

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct Reloaded {
    pub reloaded: bool,
    pub warnings: Vec<String>,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// POST /api/config/reload - Re-read the label configuration file.
pub async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<Reloaded>, EtiquetaError> {
    let warnings = state.service.reload_config().await?;
    Ok(Json(Reloaded {
        reloaded: true,
        warnings,
    }))
}
