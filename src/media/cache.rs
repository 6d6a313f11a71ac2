//! Per-printer profile cache.
//!
//! Entries are immutable `Arc<PrinterProfile>` values. A refresh builds a
//! new profile outside the lock and swaps it in; readers holding the old
//! `Arc` keep a consistent view.
//!
//! Every entry remembers the configuration snapshot it was built from and
//! is only handed out for that same snapshot, so a profile that finishes
//! building after a reload is never served under the new configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::config::LabelConfig;
use crate::printer::PrinterProfile;

struct CachedProfile {
    profile: Arc<PrinterProfile>,
    config: Arc<LabelConfig>,
    fetched_at: Instant,
}

pub struct ProfileCache {
    entries: RwLock<HashMap<String, CachedProfile>>,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh entry for a printer built from `config`, if any.
    pub async fn get(&self, printer: &str, config: &Arc<LabelConfig>) -> Option<Arc<PrinterProfile>> {
        let entries = self.entries.read().await;
        entries
            .get(printer)
            .filter(|entry| Arc::ptr_eq(&entry.config, config))
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.profile.clone())
    }

    pub async fn insert(&self, profile: Arc<PrinterProfile>, config: Arc<LabelConfig>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            profile.name.clone(),
            CachedProfile {
                profile,
                config,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> Arc<PrinterProfile> {
        Arc::new(PrinterProfile {
            name: name.into(),
            sizes: Vec::new(),
            default_size: None,
            dpi: 203,
            enabled_sizes: None,
            reported_dimensions: HashMap::new(),
            metadata_available: false,
            warnings: Vec::new(),
        })
    }

    fn config() -> Arc<LabelConfig> {
        Arc::new(LabelConfig::default())
    }

    #[tokio::test]
    async fn test_get_returns_same_snapshot() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let config = config();
        cache.insert(profile("P"), config.clone()).await;

        let a = cache.get("P", &config).await.unwrap();
        let b = cache.get("P", &config).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.get("Q", &config).await.is_none());
    }

    #[tokio::test]
    async fn test_entry_from_other_config_is_not_served() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let old = config();
        cache.insert(profile("P"), old.clone()).await;

        assert!(cache.get("P", &config()).await.is_none());
        assert!(cache.get("P", &old).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entries_are_ignored_and_purged() {
        let cache = ProfileCache::new(Duration::ZERO);
        let config = config();
        cache.insert(profile("P"), config.clone()).await;

        assert!(cache.get("P", &config).await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_clears_everything() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.insert(profile("P"), config()).await;
        cache.insert(profile("Q"), config()).await;
        cache.invalidate().await;
        assert_eq!(cache.len().await, 0);
    }
}
