//! HTTP handlers for the server.

pub mod config;
pub mod labels;
pub mod printers;
pub mod templates;

use std::collections::{BTreeMap, HashMap};

use crate::binding::{Payload, RequestData};
use crate::config::Orientation;
use crate::error::EtiquetaError;
use crate::service::LabelRequest;

/// Query parameters that override printer and media selection.
const OVERRIDE_PARAMS: &[&str] = &["printer", "label_size", "orientation"];

/// A label request taken apart from its query string and body.
#[derive(Debug, Default)]
pub struct ParsedQuery {
    pub request: LabelRequest,
    /// Endpoint options such as `quantity`; never passed to bindings.
    pub options: HashMap<String, String>,
}

impl ParsedQuery {
    /// Split query parameters into overrides, endpoint `options` and
    /// submitted fields. The body becomes the structured payload.
    pub fn parse(
        params: Vec<(String, String)>,
        options: &[&str],
        body: &[u8],
    ) -> Result<Self, EtiquetaError> {
        let mut parsed = ParsedQuery::default();
        let mut fields = BTreeMap::new();

        for (name, value) in params {
            if options.contains(&name.as_str()) {
                parsed.options.insert(name, value);
                continue;
            }
            if !OVERRIDE_PARAMS.contains(&name.as_str()) {
                fields.insert(name, value);
                continue;
            }

            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match name.as_str() {
                "printer" => parsed.request.printer = Some(value.to_string()),
                "label_size" => parsed.request.size = Some(value.to_string()),
                _ => {
                    let orientation = Orientation::parse(value).ok_or_else(|| {
                        EtiquetaError::InvalidRequest(format!(
                            "orientation must be 'standard' or 'rotated', got '{}'",
                            value
                        ))
                    })?;
                    parsed.request.orientation = Some(orientation);
                }
            }
        }

        parsed.request.data = RequestData::new(fields, Payload::from_json_bytes(body));
        Ok(parsed)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn u32_option(&self, name: &str) -> Result<Option<u32>, EtiquetaError> {
        self.option(name)
            .map(|v| {
                v.parse().map_err(|_| {
                    EtiquetaError::InvalidRequest(format!("{} must be a positive integer", name))
                })
            })
            .transpose()
    }

    pub fn bool_option(&self, name: &str) -> bool {
        self.option(name)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }
}
