//! Priority chains.
//!
//! Each chain is an ordered list of candidates; the first present one
//! wins. Empty strings count as absent.
//!
//! | Chain | Order |
//! |-------|-------|
//! | dimensions | reported → parsed key → printable area → 300x200 |
//! | default size | request → reported default → configured default → first catalog entry |
//! | printer | request → configured → reported default → first filtered printer |

use crate::config::LabelConfig;
use crate::error::{ConfigErrorCode, EtiquetaError};
use crate::printer::{PrinterProfile, SizeSource};

use super::parse::{parse_size_key, pixels_to_mm};

/// Dimensions used when nothing else is known.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (300, 200);

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn positive(dims: (u32, u32)) -> Option<(u32, u32)> {
    (dims.0 > 0 && dims.1 > 0).then_some(dims)
}

/// Pixel dimensions for a size key and the tier that produced them.
pub fn resolve_dimensions(
    profile: &PrinterProfile,
    config: &LabelConfig,
    key: &str,
) -> ((u32, u32), SizeSource) {
    if let Some(dims) = profile.reported_dimensions.get(key).copied().and_then(positive) {
        return (dims, SizeSource::Reported);
    }
    if let Some(dims) = parse_size_key(key).and_then(|p| positive(p.to_pixels(profile.dpi))) {
        return (dims, SizeSource::ParsedName);
    }
    if let Some(dims) = config.printable_area(key) {
        return (dims, SizeSource::Configured);
    }
    (FALLBACK_DIMENSIONS, SizeSource::DefaultFallback)
}

/// Size key to use when the request may or may not name one.
///
/// The winner is replaced by the first allowed size when a non-empty
/// allow-list excludes it.
pub fn resolve_default_size(
    requested: Option<&str>,
    profile: &PrinterProfile,
    config: &LabelConfig,
) -> Result<String, EtiquetaError> {
    let winner = present(requested)
        .or_else(|| present(profile.default_size.as_deref()))
        .or_else(|| config.default_size())
        .or_else(|| profile.sizes.first().map(|s| s.key.as_str()))
        .ok_or_else(|| {
            EtiquetaError::config(
                ConfigErrorCode::EmptyCatalog,
                format!("no media size available for printer '{}'", profile.name),
            )
        })?;

    match &profile.enabled_sizes {
        Some(allowed) if !allowed.iter().any(|k| k == winner) => match allowed.first() {
            Some(first) => {
                tracing::debug!(winner, substitute = %first, "size not enabled for printer");
                Ok(first.clone())
            }
            None => Ok(winner.to_string()),
        },
        _ => Ok(winner.to_string()),
    }
}

/// Printer to use for a request.
///
/// An explicit request is always honoured. Configured and reported
/// defaults must pass the include/exclude filters and, when the printer
/// list is known, be part of it.
pub fn select_printer(
    requested: Option<&str>,
    reported_default: Option<&str>,
    available: &[String],
    config: &LabelConfig,
) -> Result<String, EtiquetaError> {
    if let Some(name) = present(requested) {
        return Ok(name.to_string());
    }

    let filtered = config.filter_printers(available);
    let eligible = |name: &str| {
        let passes_filters = !config.filter_printers(&[name.to_string()]).is_empty();
        passes_filters && (available.is_empty() || filtered.iter().any(|p| p == name))
    };

    let candidate = config
        .configured_printer()
        .filter(|name| eligible(*name))
        .or_else(|| present(reported_default).filter(|name| eligible(*name)))
        .or_else(|| filtered.first().map(String::as_str));

    candidate.map(str::to_string).ok_or_else(|| {
        EtiquetaError::config(ConfigErrorCode::NoPrinters, "no printer available")
    })
}

/// Media name sent with a job.
///
/// Keys from the service vocabulary and keys already written as
/// `Custom.<w>x<h><unit>` pass unchanged. Other keys become
/// `Custom.<w>x<h>mm` from their resolved dimensions, unless only the
/// fallback tier knows them.
pub fn protocol_media_name(profile: &PrinterProfile, config: &LabelConfig, key: &str) -> String {
    if profile.is_reported(key) {
        return key.to_string();
    }
    if key.starts_with("Custom.") && parse_size_key(key).is_some() {
        return key.to_string();
    }

    match resolve_dimensions(profile, config, key) {
        (_, SizeSource::DefaultFallback) => key.to_string(),
        ((width, height), _) => format!(
            "Custom.{}x{}mm",
            pixels_to_mm(width, profile.dpi),
            pixels_to_mm(height, profile.dpi)
        ),
    }
}
