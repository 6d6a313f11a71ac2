//! Catalog merge.
//!
//! | Metadata | Result |
//! |----------|--------|
//! | disabled | configured sizes only (may be empty) |
//! | answered | reported sizes in service order, then configured sizes whose key is new |
//! | failed   | configured sizes only |
//!
//! Keys match exactly. Keys that differ only by case are both kept and
//! reported as warnings.

use std::collections::HashSet;

use crate::config::{SizeTable, case_collisions};
use crate::printer::{MediaSize, PrinterAttributes, SizeSource};

use super::parse::display_label;

/// Merged catalog plus configuration warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedCatalog {
    pub sizes: Vec<MediaSize>,
    pub warnings: Vec<String>,
}

pub fn merge_catalog(reported: Option<&PrinterAttributes>, configured: &SizeTable) -> MergedCatalog {
    let mut sizes = Vec::new();
    let mut seen = HashSet::new();

    if let Some(attrs) = reported {
        for key in &attrs.media_supported {
            if seen.insert(key.clone()) {
                sizes.push(MediaSize::unresolved(
                    key.clone(),
                    display_label(key),
                    SizeSource::Reported,
                ));
            }
        }
    }

    for (key, label) in configured.iter() {
        if seen.insert(key.to_string()) {
            sizes.push(MediaSize::unresolved(key, label, SizeSource::Configured));
        } else {
            tracing::debug!(key, "configured size shadowed by reported size");
        }
    }

    let warnings = case_collisions(sizes.iter().map(|s| s.key.as_str()));
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    MergedCatalog { sizes, warnings }
}
