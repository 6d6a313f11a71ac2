//! Server state and configuration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::service::LabelService;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8013")
    pub listen_addr: String,
    /// How often expired printer profiles are dropped from the cache.
    pub purge_interval: Duration,
}

impl ServerConfig {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            purge_interval: Duration::from_secs(60),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub service: Arc<LabelService>,
    pub started: Instant,
}

impl AppState {
    pub fn new(service: Arc<LabelService>) -> Self {
        Self {
            service,
            started: Instant::now(),
        }
    }
}
