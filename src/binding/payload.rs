//! Request data: submitted form fields plus a structured payload.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::BindingError;

/// Structured payload submitted with a request.
///
/// Numbers and booleans become their textual form; `null` becomes
/// [`Payload::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Scalar(String),
    Sequence(Vec<Payload>),
    Mapping(BTreeMap<String, Payload>),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Empty,
            Value::Bool(b) => Payload::Scalar(b.to_string()),
            Value::Number(n) => Payload::Scalar(n.to_string()),
            Value::String(s) => Payload::Scalar(s),
            Value::Array(items) => Payload::Sequence(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Mapping(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl Payload {
    /// Parse a request body leniently: empty or invalid JSON is an empty
    /// payload.
    pub fn from_json_bytes(body: &[u8]) -> Payload {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Payload::Empty;
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Payload::from(value),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring request body that is not JSON");
                Payload::Empty
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Scalar(_) => "scalar",
            Payload::Sequence(_) => "sequence",
            Payload::Mapping(_) => "mapping",
        }
    }

    /// Element of a sequence payload.
    pub fn at(&self, index: usize) -> Result<&Payload, BindingError> {
        match self {
            Payload::Sequence(items) => items.get(index).ok_or(BindingError::IndexOutOfRange {
                index,
                len: items.len(),
            }),
            other => Err(BindingError::ShapeMismatch {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }

    /// Entry of a mapping payload. An empty payload has no entries.
    pub fn get(&self, key: &str) -> Result<Option<&Payload>, BindingError> {
        match self {
            Payload::Mapping(map) => Ok(map.get(key)),
            Payload::Empty => Ok(None),
            other => Err(BindingError::ShapeMismatch {
                expected: "mapping",
                found: other.kind(),
            }),
        }
    }

    /// Text of a scalar; `None` for an empty payload.
    pub fn as_text(&self, what: &str) -> Result<Option<String>, BindingError> {
        match self {
            Payload::Empty => Ok(None),
            Payload::Scalar(s) => Ok(Some(s.clone())),
            _ => Err(BindingError::NotScalar(what.to_string())),
        }
    }
}

/// Everything a request supplies to bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    /// Submitted form fields.
    pub fields: BTreeMap<String, String>,
    pub payload: Payload,
}

impl RequestData {
    pub fn new(fields: BTreeMap<String, String>, payload: Payload) -> Self {
        Self { fields, payload }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    /// Placeholder lookup: scalar payload entry first, then form field.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let from_payload = match &self.payload {
            Payload::Mapping(map) => match map.get(name) {
                Some(Payload::Scalar(s)) => Some(s.clone()),
                _ => None,
            },
            _ => None,
        };
        from_payload.or_else(|| self.fields.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_value() {
        let payload = Payload::from(json!({"a": 1, "b": [true, null], "c": "x"}));
        let Payload::Mapping(map) = &payload else {
            panic!("expected mapping");
        };
        assert_eq!(map["a"], Payload::Scalar("1".into()));
        assert_eq!(
            map["b"],
            Payload::Sequence(vec![Payload::Scalar("true".into()), Payload::Empty])
        );
    }

    #[test]
    fn test_lenient_body_parsing() {
        assert_eq!(Payload::from_json_bytes(b""), Payload::Empty);
        assert_eq!(Payload::from_json_bytes(b"  \n"), Payload::Empty);
        assert_eq!(Payload::from_json_bytes(b"{oops"), Payload::Empty);
        assert_eq!(
            Payload::from_json_bytes(b"[\"a\"]"),
            Payload::Sequence(vec![Payload::Scalar("a".into())])
        );
    }

    #[test]
    fn test_index_errors() {
        let seq = Payload::from(json!(["a", "b"]));
        assert_eq!(seq.at(1).unwrap(), &Payload::Scalar("b".into()));
        assert_eq!(
            seq.at(5).unwrap_err(),
            BindingError::IndexOutOfRange { index: 5, len: 2 }
        );
        assert_eq!(
            Payload::from(json!({"a": 1})).at(0).unwrap_err(),
            BindingError::ShapeMismatch {
                expected: "sequence",
                found: "mapping"
            }
        );
    }

    #[test]
    fn test_key_lookup_shapes() {
        assert_eq!(Payload::Empty.get("a").unwrap(), None);
        assert!(Payload::from(json!(["a"])).get("a").is_err());
    }

    #[test]
    fn test_lookup_prefers_payload() {
        let data = RequestData::new(BTreeMap::new(), Payload::from(json!({"name": "payload"})))
            .with_field("name", "field")
            .with_field("other", "field-only");
        assert_eq!(data.lookup("name").as_deref(), Some("payload"));
        assert_eq!(data.lookup("other").as_deref(), Some("field-only"));
        assert_eq!(data.lookup("nope"), None);
    }
}
