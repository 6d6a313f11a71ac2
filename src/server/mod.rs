//! # HTTP Server for Label Preview and Printing
//!
//! A thin JSON API over [`LabelService`].
//!
//! ## Usage
//!
//! ```bash
//! etiqueta serve --listen 0.0.0.0:8013
//! ```
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness |
//! | `GET /api/printers` | filtered printer list and default |
//! | `GET /api/printer/:name/media` | merged media catalog |
//! | `GET /api/templates` | template files |
//! | `GET`/`PUT /api/template/:file` | raw template source |
//! | `GET /api/template/:file/fields` | fields a template expects |
//! | `POST /api/preview/template/:file` | compose (`return_format=png\|base64\|json`) |
//! | `POST /api/print/template/:file` | compose and print (`quantity`, `strict`) |
//! | `POST /api/preview/text`, `/api/print/text` | single text label |
//! | `POST /api/config/reload` | re-read the label configuration |
//!
//! Query parameters `printer`, `label_size` and `orientation` override the
//! defaults; any other query parameter is a submitted field, and a JSON body
//! is the structured payload.

mod error;
mod handlers;
mod state;

pub use error::status_for;
pub use handlers::labels::ELEMENT_ERRORS_HEADER;
pub use state::{AppState, ServerConfig};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::EtiquetaError;
use crate::service::LabelService;

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::config::health))
        // Printers
        .route("/api/printers", get(handlers::printers::list))
        .route("/api/printer/:name/media", get(handlers::printers::media))
        // Templates
        .route("/api/templates", get(handlers::templates::list))
        .route(
            "/api/template/:file",
            get(handlers::templates::get).put(handlers::templates::save),
        )
        .route(
            "/api/template/:file/fields",
            get(handlers::templates::fields),
        )
        // Labels
        .route(
            "/api/preview/template/:file",
            post(handlers::labels::preview_template),
        )
        .route(
            "/api/print/template/:file",
            post(handlers::labels::print_template),
        )
        .route("/api/preview/text", post(handlers::labels::preview_text))
        .route("/api/print/text", post(handlers::labels::print_text))
        // Configuration
        .route("/api/config/reload", post(handlers::config::reload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use etiqueta::server::{serve, ServerConfig};
/// use etiqueta::service::LabelService;
///
/// # async fn example(service: LabelService) -> Result<(), etiqueta::error::EtiquetaError> {
/// serve(Arc::new(service), ServerConfig::new("0.0.0.0:8013")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(service: Arc<LabelService>, config: ServerConfig) -> Result<(), EtiquetaError> {
    let app_state = Arc::new(AppState::new(service));

    // Spawn background cache cleanup task
    tokio::spawn(purge_profiles(app_state.clone(), config.clone()));

    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            EtiquetaError::Connectivity(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    tracing::info!(addr = %config.listen_addr, "etiqueta HTTP server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| EtiquetaError::Connectivity(format!("Server error: {}", e)))?;

    Ok(())
}

/// Background task dropping expired printer profiles.
async fn purge_profiles(state: Arc<AppState>, config: ServerConfig) {
    let mut interval = tokio::time::interval(config.purge_interval);
    loop {
        interval.tick().await;
        let purged = state.service.resolver().purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "dropped expired printer profiles");
        }
    }
}
