//! # Configuration
//!
//! | Part | Source | Reloadable |
//! |------|--------|------------|
//! | [`LabelConfig`] | JSON label configuration file | yes, via [`ConfigHandle`] |
//! | [`Settings`] | defaults, TOML file, `ETIQUETA__*` env | no |

mod label;
mod settings;

pub use label::{
    DEFAULT_DPI, DEFAULT_FONT_SIZE, LabelConfig, LabelOffset, LabelSection, Orientation,
    PrintableArea, PrinterSection, SizeTable, case_collisions,
};
pub use settings::{ServerSettings, Settings, TimeoutSettings};

use std::sync::Arc;

use tokio::sync::RwLock;

/// Shared, atomically replaceable label configuration.
///
/// Readers clone the current `Arc` and keep a consistent snapshot for the
/// whole request; a reload swaps the pointer and never mutates a snapshot
/// in place.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<LabelConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: LabelConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub async fn snapshot(&self) -> Arc<LabelConfig> {
        self.current.read().await.clone()
    }

    /// Publish a new configuration, returning the previous one.
    pub async fn replace(&self, config: LabelConfig) -> Arc<LabelConfig> {
        let mut guard = self.current.write().await;
        std::mem::replace(&mut *guard, Arc::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_survives_replace() {
        let handle = ConfigHandle::new(LabelConfig::default());
        let before = handle.snapshot().await;

        let mut next = LabelConfig::default();
        next.printer.use_cups = true;
        handle.replace(next).await;

        assert!(!before.printer.use_cups);
        assert!(handle.snapshot().await.printer.use_cups);
    }
}
