//! # Label Configuration File
//!
//! The JSON file describing printers and media, shared with the web
//! front-end. Sections and keys are upper-case:
//!
//! ```json
//! {
//!   "PRINTER": {
//!     "USE_CUPS": true,
//!     "SERVER": "localhost",
//!     "PRINTER": "Zebra_ZD420",
//!     "LABEL_SIZES": { "62x29mm": "62mm x 29mm" },
//!     "ENABLED_SIZES": { "Zebra_ZD420": ["62x29mm"] },
//!     "PRINTERS_INCLUDE": [],
//!     "PRINTERS_EXCLUDE": ["PDF"],
//!     "LABEL_PRINTABLE_AREA": {
//!       "62x29mm": { "dimensions": [496, 232], "offset": { "enabled": true, "offset_x": 8 } }
//!     },
//!     "PRINTER_DPI": 203,
//!     "USE_NEW_PRINT_WORKFLOW": false
//!   },
//!   "LABEL": { "DEFAULT_SIZE": "62x29mm", "DEFAULT_ORIENTATION": "standard" }
//! }
//! ```
//!
//! `LABEL_SIZES` also accepts the legacy list-of-pairs form
//! (`[["62x29mm", "62mm x 29mm"]]`); invalid entries are skipped with a
//! warning. `LABEL_PRINTABLE_AREA` entries accept a bare `[w, h]` pair.
//! A section that is `null` behaves like an empty one.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, EtiquetaError};

/// Fallback resolution for thermal label printers.
pub const DEFAULT_DPI: u32 = 203;

/// Default starting font size for text elements.
pub const DEFAULT_FONT_SIZE: u32 = 70;

/// Complete label configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelConfig {
    #[serde(rename = "PRINTER", deserialize_with = "null_as_default")]
    pub printer: PrinterSection,

    #[serde(rename = "LABEL", deserialize_with = "null_as_default")]
    pub label: LabelSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PrinterSection {
    /// Query the print service for printers and media.
    #[serde(rename = "USE_CUPS")]
    pub use_cups: bool,

    #[serde(rename = "SERVER")]
    pub server: Option<String>,

    #[serde(rename = "PRINTER")]
    pub printer: Option<String>,

    #[serde(rename = "LABEL_SIZES")]
    pub label_sizes: SizeTable,

    /// Per-printer allow-list of size keys.
    #[serde(rename = "ENABLED_SIZES", deserialize_with = "null_as_default")]
    pub enabled_sizes: HashMap<String, Vec<String>>,

    #[serde(rename = "PRINTERS_INCLUDE", deserialize_with = "null_as_default")]
    pub printers_include: Vec<String>,

    #[serde(rename = "PRINTERS_EXCLUDE", deserialize_with = "null_as_default")]
    pub printers_exclude: Vec<String>,

    #[serde(rename = "LABEL_PRINTABLE_AREA", deserialize_with = "null_as_default")]
    pub printable_area: BTreeMap<String, PrintableArea>,

    #[serde(rename = "PRINTER_DPI")]
    pub dpi: Option<u32>,

    /// Print the bitmap 1:1 without a media option.
    #[serde(rename = "USE_NEW_PRINT_WORKFLOW")]
    pub direct_print: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelSection {
    #[serde(rename = "DEFAULT_SIZE")]
    pub default_size: Option<String>,

    #[serde(rename = "DEFAULT_ORIENTATION", deserialize_with = "null_as_default")]
    pub default_orientation: Orientation,

    #[serde(rename = "DEFAULT_FONT_SIZE")]
    pub default_font_size: Option<u32>,
}

/// Label orientation.
///
/// `Rotated` swaps the logical width and height and turns content 90°
/// clockwise onto the physical media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Standard,
    Rotated,
}

impl Orientation {
    pub fn parse(s: &str) -> Option<Orientation> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Orientation::Standard),
            "rotated" => Some(Orientation::Rotated),
            _ => None,
        }
    }
}

// ============================================================================
// SIZE TABLE
// ============================================================================

/// Ordered `key -> display label` table.
///
/// Keeps file order, which is the order configured sizes are appended to
/// the merged catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "BTreeMap<String, String>")]
pub struct SizeTable {
    entries: Vec<(String, String)>,
}

impl SizeTable {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        let mut table = SizeTable::default();
        for (key, label) in entries {
            table.insert(key, label);
        }
        table
    }

    /// Insert or replace, keeping the first position of a key.
    pub fn insert(&mut self, key: String, label: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((key, label)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<SizeTable> for BTreeMap<String, String> {
    fn from(table: SizeTable) -> Self {
        table.entries.into_iter().collect()
    }
}

impl<'de> Deserialize<'de> for SizeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SizeTableVisitor)
    }
}

struct SizeTableVisitor;

impl<'de> Visitor<'de> for SizeTableVisitor {
    type Value = SizeTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of size keys to labels or a list of [key, label] pairs")
    }

    fn visit_unit<E: de::Error>(self) -> Result<SizeTable, E> {
        Ok(SizeTable::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<SizeTable, E> {
        Ok(SizeTable::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SizeTable, A::Error> {
        let mut table = SizeTable::default();
        while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
            match value {
                serde_json::Value::String(label) => table.insert(key, label),
                other => {
                    tracing::warn!(key = %key, value = %other, "skipping invalid label size entry");
                }
            }
        }
        Ok(table)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SizeTable, A::Error> {
        let mut table = SizeTable::default();
        while let Some(item) = seq.next_element::<serde_json::Value>()? {
            let pair = item.as_array().and_then(|arr| match arr.as_slice() {
                [serde_json::Value::String(k), serde_json::Value::String(v), ..] => {
                    Some((k.clone(), v.clone()))
                }
                _ => None,
            });
            match pair {
                Some((key, label)) => table.insert(key, label),
                None => tracing::warn!(entry = %item, "skipping invalid label size entry"),
            }
        }
        Ok(table)
    }
}

// ============================================================================
// PRINTABLE AREA
// ============================================================================

/// Pixel dimensions configured for a size key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PrintableArea {
    /// `[width, height]`
    Legacy([u32; 2]),
    /// `{ "dimensions": [w, h], "offset": { ... } }`
    Detailed {
        dimensions: [u32; 2],
        #[serde(default)]
        offset: LabelOffset,
    },
}

impl PrintableArea {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            PrintableArea::Legacy([w, h]) => (*w, *h),
            PrintableArea::Detailed {
                dimensions: [w, h], ..
            } => (*w, *h),
        }
    }

    pub fn offset(&self) -> LabelOffset {
        match self {
            PrintableArea::Legacy(_) => LabelOffset::default(),
            PrintableArea::Detailed { offset, .. } => *offset,
        }
    }
}

/// Shift applied to the bitmap in the direct print workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelOffset {
    pub enabled: bool,
    pub offset_x: u32,
    pub offset_y: u32,
}

// ============================================================================
// LOADING AND QUERIES
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treat empty strings like missing values.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl LabelConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EtiquetaError> {
        serde_json::from_str(json).map_err(|e| {
            EtiquetaError::config(
                ConfigErrorCode::InvalidConfig,
                format!("invalid label configuration: {}", e),
            )
        })
    }

    pub fn load(path: &Path) -> Result<Self, EtiquetaError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EtiquetaError::config(
                ConfigErrorCode::InvalidConfig,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), sizes = config.printer.label_sizes.len(), "loaded label configuration");
        Ok(config)
    }

    pub fn configured_printer(&self) -> Option<&str> {
        non_empty(&self.printer.printer)
    }

    pub fn configured_server(&self) -> Option<&str> {
        non_empty(&self.printer.server)
    }

    pub fn default_size(&self) -> Option<&str> {
        non_empty(&self.label.default_size)
    }

    pub fn default_font_size(&self) -> u32 {
        self.label.default_font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    pub fn printable_area(&self, key: &str) -> Option<(u32, u32)> {
        self.printer
            .printable_area
            .get(key)
            .map(PrintableArea::dimensions)
            .filter(|(w, h)| *w > 0 && *h > 0)
    }

    /// Offset for a size key; disabled when not configured.
    pub fn label_offset(&self, key: &str) -> LabelOffset {
        self.printer
            .printable_area
            .get(key)
            .map(PrintableArea::offset)
            .unwrap_or_default()
    }

    /// Allow-list for a printer. `None` when absent or empty.
    pub fn enabled_sizes(&self, printer: &str) -> Option<&[String]> {
        self.printer
            .enabled_sizes
            .get(printer)
            .map(Vec::as_slice)
            .filter(|sizes| !sizes.is_empty())
    }

    /// Apply `PRINTERS_INCLUDE` then `PRINTERS_EXCLUDE`. Exclusion wins.
    pub fn filter_printers(&self, printers: &[String]) -> Vec<String> {
        let include = &self.printer.printers_include;
        let exclude = &self.printer.printers_exclude;
        printers
            .iter()
            .filter(|p| include.is_empty() || include.contains(p))
            .filter(|p| !exclude.contains(p))
            .cloned()
            .collect()
    }

    /// Collect configuration problems without failing.
    pub fn validate(&self, printers: &[String]) -> Vec<String> {
        let mut problems = Vec::new();

        if printers.is_empty() {
            problems.push("No printers found. Check the print service or PRINTER settings.".to_string());
        } else if let Some(configured) = self.configured_printer() {
            if !printers.iter().any(|p| p == configured) {
                problems.push(format!(
                    "Configured printer '{}' not found among available printers: {}",
                    configured,
                    printers.join(", ")
                ));
            }
        }

        let sizes = &self.printer.label_sizes;
        if sizes.is_empty() && !self.printer.use_cups {
            problems.push("No label sizes configured.".to_string());
        }

        if let Some(default) = self.default_size() {
            if !sizes.is_empty() && sizes.get(default).is_none() && !self.printer.use_cups {
                problems.push(format!(
                    "Default label size '{}' is not among configured label sizes",
                    default
                ));
            }
        }

        problems.extend(case_collisions(sizes.keys()));
        problems
    }
}

/// Warnings for keys that differ only by case.
pub fn case_collisions<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    let mut warnings = Vec::new();
    for key in keys {
        match seen.get(&key.to_lowercase()) {
            Some(first) if *first != key => warnings.push(format!(
                "Label sizes '{}' and '{}' differ only by case; both are kept",
                first, key
            )),
            Some(_) => {}
            None => {
                seen.insert(key.to_lowercase(), key);
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_sizes_map_keeps_file_order() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"LABEL_SIZES": {"b": "B", "a": "A", "c": "C"}}}"#,
        )
        .unwrap();
        let keys: Vec<_> = cfg.printer.label_sizes.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_legacy_pair_list_is_normalized() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"LABEL_SIZES": [["62x29mm", "62mm x 29mm"], ["bad"], 7, ["4x6in", "4in x 6in"]]}}"#,
        )
        .unwrap();
        let sizes = &cfg.printer.label_sizes;
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes.get("62x29mm"), Some("62mm x 29mm"));
        assert_eq!(sizes.get("4x6in"), Some("4in x 6in"));
    }

    #[test]
    fn test_null_sections_are_defaults() {
        let cfg = LabelConfig::from_json_str(r#"{"PRINTER": null, "LABEL": null}"#).unwrap();
        assert!(!cfg.printer.use_cups);
        assert!(cfg.printer.label_sizes.is_empty());
        assert_eq!(cfg.label.default_orientation, Orientation::Standard);
        assert_eq!(cfg.default_font_size(), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"PRINTER": ""}, "LABEL": {"DEFAULT_SIZE": "  "}}"#,
        )
        .unwrap();
        assert_eq!(cfg.configured_printer(), None);
        assert_eq!(cfg.default_size(), None);
    }

    #[test]
    fn test_printable_area_both_formats() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"LABEL_PRINTABLE_AREA": {
                "old": [457, 254],
                "new": {"dimensions": [696, 271], "offset": {"enabled": true, "offset_x": 10, "offset_y": 4}}
            }}}"#,
        )
        .unwrap();
        assert_eq!(cfg.printable_area("old"), Some((457, 254)));
        assert_eq!(cfg.printable_area("new"), Some((696, 271)));
        assert!(!cfg.label_offset("old").enabled);
        assert_eq!(
            cfg.label_offset("new"),
            LabelOffset {
                enabled: true,
                offset_x: 10,
                offset_y: 4
            }
        );
        assert_eq!(cfg.label_offset("missing"), LabelOffset::default());
    }

    #[test]
    fn test_filter_printers_include_then_exclude() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"PRINTERS_INCLUDE": ["A", "B"], "PRINTERS_EXCLUDE": ["B", "C"]}}"#,
        )
        .unwrap();
        let printers = vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()];
        assert_eq!(cfg.filter_printers(&printers), vec!["A".to_string()]);
    }

    #[test]
    fn test_enabled_sizes_empty_means_all() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"ENABLED_SIZES": {"P1": [], "P2": ["a"]}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.enabled_sizes("P1"), None);
        assert_eq!(cfg.enabled_sizes("P2"), Some(&["a".to_string()][..]));
        assert_eq!(cfg.enabled_sizes("P3"), None);
    }

    #[test]
    fn test_validate_reports_problems() {
        let cfg = LabelConfig::from_json_str(
            r#"{"PRINTER": {"PRINTER": "Ghost", "LABEL_SIZES": {"62x29": "a", "62X29": "b"}},
                "LABEL": {"DEFAULT_SIZE": "4x6in"}}"#,
        )
        .unwrap();
        let problems = cfg.validate(&["Real".to_string()]);
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("'Ghost' not found"));
        assert!(problems[1].contains("'4x6in'"));
        assert!(problems[2].contains("differ only by case"));

        let empty = LabelConfig::default().validate(&[]);
        assert_eq!(empty.len(), 2);
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!(Orientation::parse("Rotated"), Some(Orientation::Rotated));
        assert_eq!(Orientation::parse("standard"), Some(Orientation::Standard));
        assert_eq!(Orientation::parse("sideways"), None);
    }
}
