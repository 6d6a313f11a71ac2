//! # Media Resolution
//!
//! Reconciles what the print service reports with the label
//! configuration and answers four questions for a request:
//!
//! 1. which printer to use ([`MediaResolver::resolve_printer`])
//! 2. which sizes that printer offers ([`MediaResolver::profile`])
//! 3. which size to use and its pixel dimensions
//!    ([`MediaResolver::resolve_media_size`])
//! 4. which media name to send with the job
//!    ([`MediaResolver::protocol_media_name`])
//!
//! Metadata failures never fail a request: they are logged and the
//! configured values are used instead.
//!
//! Each question has an `_in` variant taking an explicit configuration
//! snapshot. A request takes one snapshot and passes it to every step so
//! that a concurrent reload cannot mix two configurations.
//!
//! ## Modules
//!
//! - [`parse`]: `WxH{in,mm}` size keys
//! - [`catalog`]: reported/configured catalog merge
//! - [`resolve`]: priority chains
//! - [`cache`]: per-printer profile cache

pub mod cache;
pub mod catalog;
pub mod parse;
pub mod resolve;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigHandle, DEFAULT_DPI, LabelConfig};
use crate::error::{ConfigErrorCode, EtiquetaError};
use crate::printer::{MediaSize, MetadataSource, PrinterAttributes, PrinterProfile};
use crate::render::canvas::within_canvas_limits;

use cache::ProfileCache;
use catalog::merge_catalog;
use parse::{display_label, hundredths_mm_to_pixels};

pub use resolve::FALLBACK_DIMENSIONS;

/// Default bound on a single metadata query.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lifetime of a cached profile.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

pub struct MediaResolver {
    config: ConfigHandle,
    source: Arc<dyn MetadataSource>,
    cache: ProfileCache,
    metadata_timeout: Duration,
}

impl MediaResolver {
    pub fn new(config: ConfigHandle, source: Arc<dyn MetadataSource>) -> Self {
        Self {
            config,
            source,
            cache: ProfileCache::new(DEFAULT_CACHE_TTL),
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ProfileCache::new(ttl);
        self
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Current configuration snapshot.
    pub async fn snapshot(&self) -> Arc<LabelConfig> {
        self.config.snapshot().await
    }

    async fn query<T, F>(&self, what: &str, fut: F) -> Result<T, EtiquetaError>
    where
        F: Future<Output = Result<T, EtiquetaError>>,
    {
        tokio::time::timeout(self.metadata_timeout, fut)
            .await
            .map_err(|_| {
                EtiquetaError::Connectivity(format!(
                    "{} timed out after {}ms",
                    what,
                    self.metadata_timeout.as_millis()
                ))
            })?
    }

    /// Unfiltered printer list. Empty when the service cannot be reached.
    async fn all_printers(&self, config: &LabelConfig) -> Vec<String> {
        if !config.printer.use_cups {
            return config
                .configured_printer()
                .map(|p| vec![p.to_string()])
                .unwrap_or_default();
        }
        match self.query("printer listing", self.source.list_printers()).await {
            Ok(printers) => printers,
            Err(e) => {
                tracing::warn!(error = %e, "could not list printers");
                Vec::new()
            }
        }
    }

    /// Printers after `PRINTERS_INCLUDE` / `PRINTERS_EXCLUDE`.
    pub async fn printers(&self) -> Vec<String> {
        let config = self.config.snapshot().await;
        self.printers_in(&config).await
    }

    pub async fn printers_in(&self, config: &LabelConfig) -> Vec<String> {
        let all = self.all_printers(config).await;
        config.filter_printers(&all)
    }

    /// Printer name for a request.
    pub async fn resolve_printer(&self, requested: Option<&str>) -> Result<String, EtiquetaError> {
        let config = self.config.snapshot().await;
        self.resolve_printer_in(&config, requested).await
    }

    pub async fn resolve_printer_in(
        &self,
        config: &LabelConfig,
        requested: Option<&str>,
    ) -> Result<String, EtiquetaError> {
        if let Some(name) = requested.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(name.to_string());
        }

        let available = self.all_printers(config).await;
        let reported_default = if config.printer.use_cups {
            match self.query("default printer", self.source.default_printer()).await {
                Ok(default) => default,
                Err(e) => {
                    tracing::warn!(error = %e, "could not query default printer");
                    None
                }
            }
        } else {
            None
        };

        let printer = resolve::select_printer(
            None,
            reported_default.as_deref(),
            &available,
            config,
        )?;
        tracing::debug!(printer = %printer, "resolved printer");
        Ok(printer)
    }

    /// Merged profile for a printer, cached per printer.
    pub async fn profile(&self, printer: &str) -> Arc<PrinterProfile> {
        let config = self.config.snapshot().await;
        self.profile_in(&config, printer).await
    }

    /// Profile built from `config`. The result is only cached while
    /// `config` is still the published snapshot.
    pub async fn profile_in(&self, config: &Arc<LabelConfig>, printer: &str) -> Arc<PrinterProfile> {
        if let Some(profile) = self.cache.get(printer, config).await {
            return profile;
        }
        let profile = Arc::new(self.build_profile(printer, config).await);
        if Arc::ptr_eq(config, &self.config.snapshot().await) {
            self.cache.insert(profile.clone(), config.clone()).await;
        } else {
            tracing::debug!(printer, "configuration reloaded while building profile, not caching");
        }
        profile
    }

    /// Resolve a printer and return its profile.
    pub async fn resolve_printer_profile(
        &self,
        requested: Option<&str>,
    ) -> Result<Arc<PrinterProfile>, EtiquetaError> {
        let config = self.config.snapshot().await;
        self.resolve_printer_profile_in(&config, requested).await
    }

    pub async fn resolve_printer_profile_in(
        &self,
        config: &Arc<LabelConfig>,
        requested: Option<&str>,
    ) -> Result<Arc<PrinterProfile>, EtiquetaError> {
        let printer = self.resolve_printer_in(config, requested).await?;
        Ok(self.profile_in(config, &printer).await)
    }

    async fn build_profile(&self, printer: &str, config: &LabelConfig) -> PrinterProfile {
        let attrs: Option<PrinterAttributes> = if config.printer.use_cups {
            match self
                .query("printer attributes", self.source.printer_attributes(printer))
                .await
            {
                Ok(attrs) => Some(attrs),
                Err(e) => {
                    tracing::warn!(printer, error = %e, "metadata query failed, using configured sizes");
                    None
                }
            }
        } else {
            None
        };

        let dpi = attrs
            .as_ref()
            .and_then(|a| a.resolution_default)
            .filter(|dpi| *dpi > 0)
            .or(config.printer.dpi.filter(|dpi| *dpi > 0))
            .unwrap_or(DEFAULT_DPI);

        let merged = merge_catalog(attrs.as_ref(), &config.printer.label_sizes);

        let reported_dimensions = attrs
            .as_ref()
            .map(|a| {
                a.media_sizes
                    .iter()
                    .map(|(key, (w, h))| {
                        (
                            key.clone(),
                            (hundredths_mm_to_pixels(*w, dpi), hundredths_mm_to_pixels(*h, dpi)),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let default_size = attrs
            .as_ref()
            .and_then(|a| a.media_default.clone())
            .filter(|s| !s.trim().is_empty());

        tracing::debug!(
            printer,
            sizes = merged.sizes.len(),
            dpi,
            metadata = attrs.is_some(),
            "built printer profile"
        );

        PrinterProfile {
            name: printer.to_string(),
            sizes: merged.sizes,
            default_size,
            dpi,
            enabled_sizes: config.enabled_sizes(printer).map(<[String]>::to_vec),
            reported_dimensions,
            metadata_available: attrs.is_some(),
            warnings: merged.warnings,
        }
    }

    /// Size for a request, with pixel dimensions and their provenance.
    pub async fn resolve_media_size(
        &self,
        profile: &PrinterProfile,
        requested: Option<&str>,
    ) -> Result<MediaSize, EtiquetaError> {
        let config = self.config.snapshot().await;
        self.resolve_media_size_in(&config, profile, requested)
    }

    pub fn resolve_media_size_in(
        &self,
        config: &LabelConfig,
        profile: &PrinterProfile,
        requested: Option<&str>,
    ) -> Result<MediaSize, EtiquetaError> {
        let key = resolve::resolve_default_size(requested, profile, config)?;
        let (dims, source) = resolve::resolve_dimensions(profile, config, &key);
        if !within_canvas_limits(dims) {
            return Err(EtiquetaError::config(
                ConfigErrorCode::MalformedSize,
                format!("size '{}' resolves to {}x{} px, larger than a label canvas", key, dims.0, dims.1),
            ));
        }
        let label = profile
            .size(&key)
            .map(|s| s.label.clone())
            .or_else(|| config.printer.label_sizes.get(&key).map(str::to_string))
            .unwrap_or_else(|| display_label(&key));

        tracing::debug!(key = %key, width = dims.0, height = dims.1, ?source, "resolved media size");
        Ok(MediaSize::resolved(key, label, dims, source))
    }

    /// Media name to submit for a size key.
    pub async fn protocol_media_name(&self, profile: &PrinterProfile, key: &str) -> String {
        let config = self.config.snapshot().await;
        resolve::protocol_media_name(profile, &config, key)
    }

    pub fn protocol_media_name_in(&self, config: &LabelConfig, profile: &PrinterProfile, key: &str) -> String {
        resolve::protocol_media_name(profile, config, key)
    }

    /// Publish a new configuration and drop every cached profile.
    pub async fn reload(&self, config: LabelConfig) {
        self.config.replace(config).await;
        self.cache.invalidate().await;
        tracing::info!("label configuration reloaded");
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    /// Configuration problems given the current printer list.
    pub async fn validate(&self) -> Vec<String> {
        let config = self.config.snapshot().await;
        let printers = self.printers_in(&config).await;
        config.validate(&printers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::SizeSource;
    use crate::transport::memory::MemoryPrinters;
    use pretty_assertions::assert_eq;

    fn resolver(config_json: &str, printers: MemoryPrinters) -> MediaResolver {
        let config = LabelConfig::from_json_str(config_json).unwrap();
        MediaResolver::new(ConfigHandle::new(config), Arc::new(printers))
    }

    fn zebra() -> MemoryPrinters {
        MemoryPrinters::new()
            .with_printer(
                "Zebra",
                PrinterAttributes {
                    media_supported: vec!["na_index-4x6_4x6in".into(), "Custom.2x1in".into()],
                    media_default: Some("na_index-4x6_4x6in".into()),
                    media_sizes: [("Custom.2x1in".to_string(), (5080, 2540))].into_iter().collect(),
                    resolution_default: Some(300),
                },
            )
            .with_default("Zebra")
    }

    #[tokio::test]
    async fn test_metadata_enabled_merges_catalog() {
        let r = resolver(
            r#"{"PRINTER": {"USE_CUPS": true, "LABEL_SIZES": {"Custom.2x1in": "dup", "62x29mm": "Brother"}}}"#,
            zebra(),
        );
        let profile = r.resolve_printer_profile(None).await.unwrap();
        assert_eq!(profile.name, "Zebra");
        assert_eq!(profile.dpi, 300);
        let keys: Vec<_> = profile.sizes.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["na_index-4x6_4x6in", "Custom.2x1in", "62x29mm"]);

        let size = r.resolve_media_size(&profile, None).await.unwrap();
        assert_eq!(size.key, "na_index-4x6_4x6in");
        assert_eq!(size.dimensions(), Some((1200, 1800)));
        assert_eq!(size.source, SizeSource::ParsedName);

        let exact = r.resolve_media_size(&profile, Some("Custom.2x1in")).await.unwrap();
        assert_eq!(exact.dimensions(), Some((600, 300)));
        assert_eq!(exact.source, SizeSource::Reported);
    }

    #[tokio::test]
    async fn test_metadata_failure_falls_back_to_configured_catalog() {
        let r = resolver(
            r#"{"PRINTER": {"USE_CUPS": true, "PRINTER": "Ghost", "PRINTER_DPI": 300,
                "LABEL_SIZES": {"62x29mm": "62 x 29"}}}"#,
            MemoryPrinters::new().failing(),
        );
        let profile = r.resolve_printer_profile(None).await.unwrap();
        assert_eq!(profile.name, "Ghost");
        assert!(!profile.metadata_available);
        assert_eq!(profile.dpi, 300);
        assert_eq!(profile.sizes.len(), 1);
        assert_eq!(profile.sizes[0].source, SizeSource::Configured);
    }

    #[tokio::test]
    async fn test_metadata_disabled_ignores_source() {
        let r = resolver(
            r#"{"PRINTER": {"PRINTER": "Desk", "LABEL_SIZES": {"mystery": "Mystery"}},
                "LABEL": {"DEFAULT_SIZE": "mystery"}}"#,
            zebra(),
        );
        assert_eq!(r.printers().await, vec!["Desk".to_string()]);
        let profile = r.resolve_printer_profile(None).await.unwrap();
        assert_eq!(profile.dpi, DEFAULT_DPI);
        let size = r.resolve_media_size(&profile, None).await.unwrap();
        assert_eq!(size.dimensions(), Some(FALLBACK_DIMENSIONS));
        assert_eq!(size.source, SizeSource::DefaultFallback);
        assert_eq!(size.label, "Mystery");
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent_and_cached() {
        let r = resolver(r#"{"PRINTER": {"USE_CUPS": true}}"#, zebra());
        let a = r.profile("Zebra").await;
        let b = r.profile("Zebra").await;
        assert!(Arc::ptr_eq(&a, &b));

        let size_a = r.resolve_media_size(&a, Some("4x6in")).await.unwrap();
        let size_b = r.resolve_media_size(&b, Some("4x6in")).await.unwrap();
        assert_eq!(size_a, size_b);
    }

    #[tokio::test]
    async fn test_reload_invalidates_cache() {
        let r = resolver(r#"{"PRINTER": {"USE_CUPS": true}}"#, zebra());
        let before = r.profile("Zebra").await;

        r.reload(LabelConfig::from_json_str(r#"{"PRINTER": {"USE_CUPS": false, "PRINTER_DPI": 600}}"#).unwrap())
            .await;
        let after = r.profile("Zebra").await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.dpi, 600);
        assert_eq!(before.dpi, 300);
    }

    #[tokio::test]
    async fn test_profile_built_during_reload_is_not_served_after_it() {
        let r = resolver(
            r#"{"PRINTER": {"USE_CUPS": true}}"#,
            zebra().with_delay(Duration::from_millis(200)),
        );

        let (stale, ()) = tokio::join!(r.profile("Zebra"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            r.reload(LabelConfig::from_json_str(r#"{"PRINTER": {"USE_CUPS": false, "PRINTER_DPI": 600}}"#).unwrap())
                .await;
        });
        assert_eq!(stale.dpi, 300);

        let after = r.profile("Zebra").await;
        assert_eq!(after.dpi, 600);
        assert!(!after.metadata_available);
    }

    #[tokio::test]
    async fn test_request_snapshot_is_used_throughout() {
        let r = resolver(r#"{"PRINTER": {"USE_CUPS": true}}"#, zebra());
        let before = r.snapshot().await;
        r.reload(LabelConfig::from_json_str(r#"{"PRINTER": {"PRINTER": "Desk"}}"#).unwrap())
            .await;

        let profile = r.resolve_printer_profile_in(&before, None).await.unwrap();
        assert_eq!(profile.name, "Zebra");
        assert_eq!(profile.dpi, 300);
        assert_eq!(r.resolve_printer_profile(None).await.unwrap().name, "Desk");
    }

    #[tokio::test]
    async fn test_oversized_key_is_malformed() {
        let r = resolver(r#"{"PRINTER": {"PRINTER": "Desk"}}"#, MemoryPrinters::new());
        let profile = r.resolve_printer_profile(None).await.unwrap();
        let err = r
            .resolve_media_size(&profile, Some("99999x99999in"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "malformed_size");
        assert!(r.resolve_media_size(&profile, Some("4x6in")).await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_metadata_is_bounded() {
        let r = resolver(
            r#"{"PRINTER": {"USE_CUPS": true, "PRINTER": "Zebra"}}"#,
            zebra().with_delay(Duration::from_millis(500)),
        )
        .with_metadata_timeout(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let profile = r.profile("Zebra").await;
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(!profile.metadata_available);
    }

    #[tokio::test]
    async fn test_allow_list_applies_to_resolved_size() {
        let r = resolver(
            r#"{"PRINTER": {"PRINTER": "P", "LABEL_SIZES": {"A": "a", "B": "b", "C": "c"},
                "ENABLED_SIZES": {"P": ["A", "B"]}},
                "LABEL": {"DEFAULT_SIZE": "C"}}"#,
            MemoryPrinters::new(),
        );
        let profile = r.resolve_printer_profile(None).await.unwrap();
        let size = r.resolve_media_size(&profile, None).await.unwrap();
        assert_eq!(size.key, "A");
        assert_eq!(profile.available_sizes().len(), 2);
    }
}
