//! # Printer Profiles
//!
//! A [`PrinterProfile`] is the merged view of one printer: the catalog of
//! [`MediaSize`]s built from reported and configured sizes, the reported
//! default, the resolution and the configured allow-list.
//!
//! Profiles are built once per refresh and shared as `Arc<PrinterProfile>`;
//! nothing mutates them afterwards.
//!
//! ## Dimensions
//!
//! ```text
//! dots_per_mm = dpi / 25.4
//! pixels      = mm * dots_per_mm
//!
//! 203 DPI, 4in x 6in   → 812 x 1218
//! 203 DPI, 100 x 50 mm → 799 x 400
//! ```

use std::collections::HashMap;

use serde::Serialize;

/// Where a media size or its dimensions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeSource {
    /// Reported by the print service.
    Reported,
    /// Parsed from a `WxH{in,mm}` key.
    ParsedName,
    /// Taken from the label configuration.
    Configured,
    /// Nothing else matched.
    DefaultFallback,
}

/// A named label format.
///
/// Catalog entries carry their origin (`Reported` or `Configured`) and no
/// dimensions; a resolved size carries pixel dimensions and the tier that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSize {
    pub key: String,
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub source: SizeSource,
}

impl MediaSize {
    pub fn unresolved(key: impl Into<String>, label: impl Into<String>, source: SizeSource) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width: None,
            height: None,
            source,
        }
    }

    pub fn resolved(
        key: impl Into<String>,
        label: impl Into<String>,
        (width, height): (u32, u32),
        source: SizeSource,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width: Some(width),
            height: Some(height),
            source,
        }
    }

    /// Pixel dimensions, once resolved.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// Merged description of one printer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrinterProfile {
    pub name: String,
    /// Reported sizes first, then configured ones not already present.
    pub sizes: Vec<MediaSize>,
    /// Default size as reported by the print service.
    pub default_size: Option<String>,
    pub dpi: u32,
    /// Configured allow-list; `None` allows every size.
    pub enabled_sizes: Option<Vec<String>>,
    /// Exact pixel dimensions reported per media key.
    #[serde(skip)]
    pub reported_dimensions: HashMap<String, (u32, u32)>,
    /// Whether the metadata source answered for this printer.
    pub metadata_available: bool,
    pub warnings: Vec<String>,
}

impl PrinterProfile {
    /// Profile with an empty catalog.
    pub fn new(name: impl Into<String>, dpi: u32) -> Self {
        Self {
            name: name.into(),
            sizes: Vec::new(),
            default_size: None,
            dpi,
            enabled_sizes: None,
            reported_dimensions: HashMap::new(),
            metadata_available: false,
            warnings: Vec::new(),
        }
    }

    pub fn size(&self, key: &str) -> Option<&MediaSize> {
        self.sizes.iter().find(|s| s.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.size(key).is_some()
    }

    /// Whether the key belongs to the print service's own vocabulary.
    pub fn is_reported(&self, key: &str) -> bool {
        self.size(key)
            .is_some_and(|s| s.source == SizeSource::Reported)
    }

    pub fn is_allowed(&self, key: &str) -> bool {
        match &self.enabled_sizes {
            Some(allowed) => allowed.iter().any(|k| k == key),
            None => true,
        }
    }

    /// The catalog restricted to the allow-list.
    pub fn available_sizes(&self) -> Vec<&MediaSize> {
        self.sizes.iter().filter(|s| self.is_allowed(&s.key)).collect()
    }

    pub fn dots_per_mm(&self) -> f64 {
        self.dpi as f64 / 25.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(enabled: Option<Vec<&str>>) -> PrinterProfile {
        PrinterProfile {
            name: "P".into(),
            sizes: vec![
                MediaSize::unresolved("a", "A", SizeSource::Reported),
                MediaSize::unresolved("b", "B", SizeSource::Configured),
                MediaSize::unresolved("c", "C", SizeSource::Configured),
            ],
            default_size: None,
            dpi: 203,
            enabled_sizes: enabled.map(|v| v.into_iter().map(String::from).collect()),
            reported_dimensions: HashMap::new(),
            metadata_available: true,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_available_sizes_respects_allow_list() {
        let keys: Vec<_> = profile(Some(vec!["c", "a"]))
            .available_sizes()
            .iter()
            .map(|s| s.key.clone())
            .collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!(profile(None).available_sizes().len(), 3);
    }

    #[test]
    fn test_reported_vocabulary() {
        let p = profile(None);
        assert!(p.is_reported("a"));
        assert!(!p.is_reported("b"));
        assert!(!p.is_reported("zzz"));
    }

    #[test]
    fn test_dimensions_only_when_resolved() {
        let m = MediaSize::unresolved("a", "A", SizeSource::Reported);
        assert_eq!(m.dimensions(), None);
        let m = MediaSize::resolved("a", "A", (300, 200), SizeSource::DefaultFallback);
        assert_eq!(m.dimensions(), Some((300, 200)));
    }
}
