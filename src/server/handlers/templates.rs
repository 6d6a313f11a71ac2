//! Template API handlers.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::EtiquetaError;
use crate::template::FieldSpec;

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub templates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateFields {
    pub template: String,
    pub fields: Vec<FieldSpec>,
}

/// GET /api/templates - List template files.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<TemplateList>, EtiquetaError> {
    let templates = state.service.templates().list()?;
    Ok(Json(TemplateList { templates }))
}

/// GET /api/template/:file - Raw template source.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, EtiquetaError> {
    let source = state.service.templates().raw(&file)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], source))
}

/// PUT /api/template/:file - Validate and store a template.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    body: String,
) -> Result<Json<TemplateFields>, EtiquetaError> {
    let store = state.service.templates();
    store.save(&file, &body)?;
    let fields = store.load(&file)?.fields();
    Ok(Json(TemplateFields { template: file, fields }))
}

/// GET /api/template/:file/fields - Form fields the template expects.
pub async fn fields(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Json<TemplateFields>, EtiquetaError> {
    let fields = state.service.templates().load(&file)?.fields();
    Ok(Json(TemplateFields { template: file, fields }))
}
