//! # Element Plugins
//!
//! Every visual element of a label is produced by a plugin registered under
//! a type tag. The registry maps the tag of an [`ElementSpec`] to a factory
//! that captures the element's style; the pipeline then hands the built
//! [`Element`] its bound value and a [`Region`] clipped to its box.
//!
//! Built-in plugins register exactly like external ones:
//!
//! ```
//! use etiqueta::elements::{Element, ElementRegistry, Geometry};
//! use etiqueta::binding::BoundValue;
//! use etiqueta::error::ElementError;
//! use etiqueta::render::Region;
//!
//! struct Dot;
//!
//! impl Element for Dot {
//!     fn render(&self, _: &Geometry, _: &BoundValue, region: &mut Region<'_>) -> Result<(), ElementError> {
//!         region.set(0, 0);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ElementRegistry::with_builtins();
//! registry.register("dot", |_| Ok(Box::new(Dot)));
//! assert!(registry.contains("dot"));
//! ```
//!
//! | Tag | Plugin |
//! |-----|--------|
//! | `text` | [`TextElement`] |
//! | `barcode` | [`BarcodeElement`] |
//! | `qr` | [`QrElement`] |
//! | `image` | [`ImageElement`] |
//! | `rect` | [`RectElement`] |
//! | `line` | [`LineElement`] |

mod barcode;
mod image;
mod shapes;
mod text;

pub use barcode::{BarcodeElement, QrElement, Symbology};
pub use self::image::{ImageElement, ImageFit};
pub use shapes::{LineElement, RectElement};
pub use text::{Align, TextElement, VAlign};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::binding::BoundValue;
use crate::config::DEFAULT_FONT_SIZE;
use crate::error::ElementError;
use crate::render::Region;
use crate::template::ElementSpec;

/// Placement of an element in logical label pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// Geometry of `spec` on a canvas; a missing width or height extends
    /// to the canvas edge.
    pub fn of(spec: &ElementSpec, canvas_width: u32, canvas_height: u32) -> Self {
        let remaining = |origin: i32, extent: u32| extent.saturating_sub(origin.max(0) as u32);
        Self {
            x: spec.x,
            y: spec.y,
            width: spec.width.unwrap_or_else(|| remaining(spec.x, canvas_width)),
            height: spec.height.unwrap_or_else(|| remaining(spec.y, canvas_height)),
        }
    }
}

/// A constructed element, ready to draw.
pub trait Element: Send + Sync {
    fn render(
        &self,
        geometry: &Geometry,
        value: &BoundValue,
        region: &mut Region<'_>,
    ) -> Result<(), ElementError>;
}

/// Style parameters handed to a factory, with typed accessors.
pub struct Style<'a> {
    element_type: &'a str,
    params: &'a Map<String, Value>,
    default_font_size: u32,
}

impl<'a> Style<'a> {
    pub fn new(element_type: &'a str, params: &'a Map<String, Value>) -> Self {
        Self {
            element_type,
            params,
            default_font_size: DEFAULT_FONT_SIZE,
        }
    }

    pub fn with_default_font_size(mut self, size: u32) -> Self {
        self.default_font_size = size;
        self
    }

    pub fn default_font_size(&self) -> u32 {
        self.default_font_size
    }

    pub fn invalid(&self, message: impl Into<String>) -> ElementError {
        ElementError::InvalidStyle {
            element_type: self.element_type.to_string(),
            message: message.into(),
        }
    }

    /// Non-negative integer; numeric strings are accepted.
    pub fn u32(&self, key: &str) -> Result<Option<u32>, ElementError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(format!("'{}' must be a non-negative integer", key))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("'{}' must be a non-negative integer", key))),
            Some(_) => Err(self.invalid(format!("'{}' must be a number", key))),
        }
    }

    pub fn str(&self, key: &str) -> Result<Option<&'a str>, ElementError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(format!("'{}' must be a string", key))),
        }
    }

    /// Boolean; `"true"`/`"false"` strings are accepted.
    pub fn bool(&self, key: &str) -> Result<Option<bool>, ElementError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(format!("'{}' must be a boolean", key))),
            },
            Some(_) => Err(self.invalid(format!("'{}' must be a boolean", key))),
        }
    }
}

/// Builds an element from its style.
pub type ElementFactory =
    Arc<dyn Fn(&Style<'_>) -> Result<Box<dyn Element>, ElementError> + Send + Sync>;

/// Type tag to factory map.
#[derive(Clone, Default)]
pub struct ElementRegistry {
    factories: HashMap<String, ElementFactory>,
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl ElementRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("text", |style| Ok(Box::new(TextElement::from_style(style)?)));
        registry.register("barcode", |style| Ok(Box::new(BarcodeElement::from_style(style)?)));
        registry.register("qr", |style| Ok(Box::new(QrElement::from_style(style)?)));
        registry.register("image", |style| Ok(Box::new(ImageElement::from_style(style)?)));
        registry.register("rect", |style| Ok(Box::new(RectElement::from_style(style)?)));
        registry.register("line", |style| Ok(Box::new(LineElement::from_style(style)?)));
        registry
    }

    /// Register a factory, replacing any previous one for `tag`.
    pub fn register<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(&Style<'_>) -> Result<Box<dyn Element>, ElementError> + Send + Sync + 'static,
    {
        if self.factories.insert(tag.to_string(), Arc::new(factory)).is_some() {
            tracing::debug!(tag, "replaced element plugin");
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn create(&self, tag: &str, style: &Style<'_>) -> Result<Box<dyn Element>, ElementError> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| ElementError::UnknownType(tag.to_string()))?;
        factory(style)
    }
}

/// Text of a bound value; binary data is an error.
pub(crate) fn text_value<'v>(
    element_type: &str,
    value: &'v BoundValue,
) -> Result<Option<&'v str>, ElementError> {
    match value {
        BoundValue::Empty => Ok(None),
        BoundValue::Text(text) => Ok(Some(text.as_str())),
        BoundValue::Bytes(_) => Err(ElementError::Render(format!(
            "{} element cannot display binary data",
            element_type
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_builtins_registered() {
        assert_eq!(
            ElementRegistry::with_builtins().types(),
            vec!["barcode", "image", "line", "qr", "rect", "text"]
        );
    }

    #[test]
    fn test_unknown_type() {
        let registry = ElementRegistry::with_builtins();
        let map = Map::new();
        let err = registry.create("hologram", &Style::new("hologram", &map)).err();
        assert_eq!(err, Some(ElementError::UnknownType("hologram".into())));
    }

    #[test]
    fn test_external_plugin_replaces_builtin() {
        struct Nothing;
        impl Element for Nothing {
            fn render(&self, _: &Geometry, _: &BoundValue, _: &mut Region<'_>) -> Result<(), ElementError> {
                Ok(())
            }
        }

        let mut registry = ElementRegistry::with_builtins();
        registry.register("text", |_| Ok(Box::new(Nothing)));
        let map = params(json!({"font_size": "not a number"}));
        assert!(registry.create("text", &Style::new("text", &map)).is_ok());
    }

    #[test]
    fn test_style_accessors() {
        let map = params(json!({"a": 12, "b": "7", "c": "yes", "d": -1, "e": [1]}));
        let style = Style::new("text", &map);
        assert_eq!(style.u32("a").unwrap(), Some(12));
        assert_eq!(style.u32("b").unwrap(), Some(7));
        assert_eq!(style.u32("missing").unwrap(), None);
        assert_eq!(style.bool("c").unwrap(), Some(true));
        assert!(style.u32("d").is_err());
        assert!(style.str("e").is_err());
    }

    #[test]
    fn test_geometry_defaults_to_canvas_edge() {
        let spec = ElementSpec {
            width: None,
            height: None,
            ..ElementSpec::new("text", 20, 50, 0, 0)
        };
        assert_eq!(
            Geometry::of(&spec, 300, 200),
            Geometry { x: 20, y: 50, width: 280, height: 150 }
        );
    }
}
