//! # Label Templates
//!
//! A template is an ordered list of elements; list order is z-order.
//!
//! ```json
//! {
//!   "name": "Shelf label",
//!   "elements": [
//!     {"type": "text", "x": 10, "y": 10, "width": 280, "height": 60,
//!      "style": {"font_size": 48, "align": "center"},
//!      "binding": {"kind": "keyed", "key": "title", "default": "Untitled"}},
//!     {"type": "barcode", "x": 10, "y": 90, "width": 280, "height": 80,
//!      "binding": {"kind": "inventory", "base_url": "http://grocy.local",
//!                  "barcode": "{{barcode}}", "field": "product.name"}}
//!   ]
//! }
//! ```
//!
//! `width`/`height` at the top level, when both present, replace the media
//! dimensions. Element `width`/`height` default to the rest of the canvas.
//!
//! ## Binding kinds
//!
//! | Kind | Value |
//! |------|-------|
//! | `literal` | fixed text |
//! | `template` | text with `{{field}}` and date placeholders |
//! | `indexed` | element of a sequence payload |
//! | `keyed` | entry of a mapping payload or form field, with default |
//! | `remote` | JSON value fetched over HTTP |
//! | `inventory` | product field from a Grocy-style stock API |
//! | `download` | raw bytes fetched over HTTP |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::placeholders;
use crate::error::{ConfigErrorCode, EtiquetaError};

/// Template file extensions, in lookup order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["lbl", "json"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

/// One positioned element.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElementSpec {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Plugin-specific parameters.
    #[serde(default)]
    pub style: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
}

impl ElementSpec {
    pub fn new(element_type: &str, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            element_type: element_type.to_string(),
            x,
            y,
            width: Some(width),
            height: Some(height),
            style: serde_json::Map::new(),
            binding: None,
        }
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_style(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.style.insert(key.to_string(), value.into());
        self
    }
}

/// How an element obtains its value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Binding {
    Literal {
        value: String,
    },
    Template {
        template: String,
    },
    Indexed {
        index: usize,
    },
    Keyed {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Remote(RemoteBinding),
    Inventory(InventoryBinding),
    Download {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteBinding {
    /// URL with `{{name}}` placeholders, filled percent-encoded.
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// JSON body for POST; string values are interpolated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Where the value sits in the response; the whole response when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<JsonPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InventoryBinding {
    pub base_url: String,
    /// Barcode, usually a `{{field}}` placeholder.
    pub barcode: String,
    #[serde(default = "default_inventory_field")]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_inventory_field() -> String {
    "product.name".to_string()
}

/// Location of a value inside a JSON document.
///
/// Either a dotted string (`"product.barcodes.0.code"`) or an explicit list
/// of keys and indices (`["product", "barcodes", 0, "code"]`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JsonPath {
    Dotted(String),
    Segments(Vec<PathSegment>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl JsonPath {
    pub fn segments(&self) -> Vec<PathSegment> {
        match self {
            JsonPath::Segments(segments) => segments.clone(),
            JsonPath::Dotted(path) => path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| PathSegment::Key(s.to_string()))
                .collect(),
        }
    }

    /// Walk the path. Keys that look like numbers also index arrays.
    pub fn extract<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments()
            .iter()
            .try_fold(value, |current, segment| match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Key(key), Value::Array(items)) => {
                    key.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
                (PathSegment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
                _ => None,
            })
    }

    pub fn describe(&self) -> String {
        match self {
            JsonPath::Dotted(path) => path.clone(),
            JsonPath::Segments(segments) => segments
                .iter()
                .map(|s| match s {
                    PathSegment::Index(i) => i.to_string(),
                    PathSegment::Key(k) => k.clone(),
                })
                .collect::<Vec<_>>()
                .join("."),
        }
    }
}

/// A form field a template expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Template {
    pub fn from_json_str(json: &str) -> Result<Self, EtiquetaError> {
        serde_json::from_str(json).map_err(|e| {
            EtiquetaError::config(
                ConfigErrorCode::InvalidTemplate,
                format!("invalid template: {}", e),
            )
        })
    }

    /// One auto-fitted text element filling the label inside a margin.
    pub fn simple_text(text: &str, width: u32, height: u32, font_size: u32, align: &str) -> Self {
        let margin = (width.min(height) / 20).max(2);
        let element = ElementSpec::new(
            "text",
            margin as i32,
            margin as i32,
            width.saturating_sub(2 * margin).max(1),
            height.saturating_sub(2 * margin).max(1),
        )
        .with_style("font_size", font_size)
        .with_style("align", align)
        .with_style("valign", "middle")
        .with_binding(Binding::Literal {
            value: text.to_string(),
        });

        Template {
            name: Some("text".to_string()),
            width: None,
            height: None,
            elements: vec![element],
        }
    }

    /// Canvas override, when both dimensions are given.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// Fields referenced by the bindings, in first-use order.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut add = |name: &str, default: Option<&String>| {
            if crate::binding::is_builtin_variable(name) {
                return;
            }
            if !fields.iter().any(|f| f.name == name) {
                fields.push(FieldSpec {
                    name: name.to_string(),
                    default: default.cloned(),
                });
            }
        };

        for element in &self.elements {
            match &element.binding {
                Some(Binding::Keyed { key, default }) => add(key.as_str(), default.as_ref()),
                Some(Binding::Template { template }) => {
                    placeholders(template).iter().for_each(|p| add(p.as_str(), None))
                }
                Some(Binding::Remote(remote)) => {
                    let mut names = placeholders(&remote.url);
                    if let Some(body) = &remote.body {
                        names.extend(placeholders(&body.to_string()));
                    }
                    names.iter().for_each(|p| add(p.as_str(), None));
                }
                Some(Binding::Inventory(inventory)) => {
                    placeholders(&inventory.barcode).iter().for_each(|p| add(p.as_str(), None))
                }
                Some(Binding::Download { url, .. }) => {
                    placeholders(url).iter().for_each(|p| add(p.as_str(), None))
                }
                Some(Binding::Literal { .. }) | Some(Binding::Indexed { .. }) | None => {}
            }
        }
        fields
    }
}

// ============================================================================
// TEMPLATE STORE
// ============================================================================

/// Templates stored as files in one directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Template file names, sorted.
    pub fn list(&self) -> Result<Vec<String>, EtiquetaError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
            if is_template {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a file name inside the store. Names with path separators are
    /// rejected; a bare name is tried with each known extension.
    fn path_for(&self, name: &str) -> Result<PathBuf, EtiquetaError> {
        let not_found = || {
            EtiquetaError::config(
                ConfigErrorCode::TemplateNotFound,
                format!("template '{}' not found", name),
            )
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(not_found());
        }

        let direct = self.dir.join(name);
        if direct.is_file() {
            return Ok(direct);
        }
        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
            .ok_or_else(not_found)
    }

    pub fn raw(&self, name: &str) -> Result<String, EtiquetaError> {
        let path = self.path_for(name)?;
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn load(&self, name: &str) -> Result<Template, EtiquetaError> {
        let mut template = Template::from_json_str(&self.raw(name)?)?;
        if template.name.is_none() {
            template.name = Some(name.to_string());
        }
        Ok(template)
    }

    /// Validate and write a template file.
    pub fn save(&self, name: &str, json: &str) -> Result<(), EtiquetaError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(EtiquetaError::config(
                ConfigErrorCode::InvalidTemplate,
                format!("invalid template name '{}'", name),
            ));
        }
        Template::from_json_str(json)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(name), json)?;
        tracing::info!(template = name, "template saved");
        Ok(())
    }
}
