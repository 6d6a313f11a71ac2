//! # Data Binding
//!
//! Turns an element's [`Binding`] plus the request's [`RequestData`] into
//! the value the element displays.
//!
//! Remote bindings are bounded by a timeout (10 s unless the binding sets
//! its own). Timeouts, connection failures, non-2xx statuses and missing
//! paths are [`BindingError`]s that fail only the element that asked.
//!
//! Dropping the future returned by [`BindingResolver::resolve`] aborts any
//! request in flight.

mod interpolate;
mod payload;

pub use interpolate::{builtin_variables, interpolate, is_builtin_variable, placeholders};
pub use payload::{Payload, RequestData};

use std::time::Duration;

use serde_json::Value;

use crate::error::{BindingError, EtiquetaError};
use crate::template::{Binding, HttpMethod, InventoryBinding, JsonPath, RemoteBinding};

/// Default bound on a remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Value produced by a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// No binding, or an empty value.
    Empty,
    Text(String),
    Bytes(Vec<u8>),
}

impl BoundValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BoundValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindingResolver {
    client: reqwest::Client,
    timeout: Duration,
}

impl BindingResolver {
    pub fn new(timeout: Duration) -> Result<Self, EtiquetaError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("etiqueta/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtiquetaError::Connectivity(format!("HTTP client error: {}", e)))?;
        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn resolve(
        &self,
        binding: Option<&Binding>,
        data: &RequestData,
    ) -> Result<BoundValue, BindingError> {
        let Some(binding) = binding else {
            return Ok(BoundValue::Empty);
        };

        match binding {
            Binding::Literal { value } => Ok(BoundValue::Text(value.clone())),
            Binding::Template { template } => Ok(BoundValue::Text(fill(template, data))),
            Binding::Indexed { index } => {
                let item = data.payload.at(*index)?;
                Ok(text_or_empty(item.as_text(&format!("[{}]", index))?))
            }
            Binding::Keyed { key, default } => resolve_keyed(key, default.as_deref(), data),
            Binding::Remote(remote) => self.resolve_remote(remote, data).await,
            Binding::Inventory(inventory) => self.resolve_inventory(inventory, data).await,
            Binding::Download { url, timeout_ms } => {
                let url = fill_url(url, data);
                let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
                let bytes = self.fetch(self.client.get(&url), &url, timeout).await?;
                Ok(BoundValue::Bytes(bytes))
            }
        }
    }

    async fn resolve_remote(
        &self,
        remote: &RemoteBinding,
        data: &RequestData,
    ) -> Result<BoundValue, BindingError> {
        let url = fill_url(&remote.url, data);
        let mut request = match remote.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let body = remote
                    .body
                    .as_ref()
                    .map(|body| fill_json(body, data))
                    .unwrap_or(Value::Null);
                self.client.post(&url).json(&body)
            }
        };
        for (name, value) in &remote.headers {
            request = request.header(name.as_str(), fill(value, data));
        }

        let timeout = remote.timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
        let body = self.fetch(request, &url, timeout).await?;
        extract(&body, remote.path.as_ref(), remote.default.as_deref())
    }

    async fn resolve_inventory(
        &self,
        inventory: &InventoryBinding,
        data: &RequestData,
    ) -> Result<BoundValue, BindingError> {
        let barcode = fill(&inventory.barcode, data);
        let url = format!(
            "{}/api/stock/products/by-barcode/{}",
            inventory.base_url.trim_end_matches('/'),
            urlencoding::encode(barcode.trim())
        );
        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(key) = &inventory.api_key {
            request = request.header("GROCY-API-KEY", fill(key, data));
        }

        let timeout = inventory.timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
        let body = self.fetch(request, &url, timeout).await?;
        extract(
            &body,
            Some(&JsonPath::Dotted(inventory.field.clone())),
            inventory.default.as_deref(),
        )
    }

    /// Send a request and return the body of a 2xx response.
    async fn fetch(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, BindingError> {
        let timeout_error = || BindingError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let connectivity = |e: reqwest::Error| {
            if e.is_timeout() {
                timeout_error()
            } else {
                BindingError::Connectivity {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let exchange = async {
            let response = request.send().await.map_err(connectivity)?;
            if !response.status().is_success() {
                return Err(BindingError::HttpStatus {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }
            let bytes = response.bytes().await.map_err(connectivity)?;
            Ok(bytes.to_vec())
        };

        let body = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| timeout_error())??;
        tracing::debug!(url, bytes = body.len(), "fetched remote binding");
        Ok(body)
    }
}

fn text_or_empty(text: Option<String>) -> BoundValue {
    match text {
        Some(text) => BoundValue::Text(text),
        None => BoundValue::Empty,
    }
}

fn resolve_keyed(
    key: &str,
    default: Option<&str>,
    data: &RequestData,
) -> Result<BoundValue, BindingError> {
    let from_payload = match data.payload.get(key) {
        Ok(Some(value)) => value.as_text(key)?,
        Ok(None) => None,
        // a non-mapping payload may still be paired with form fields
        Err(shape) => match data.fields.get(key) {
            Some(_) => None,
            None => return Err(shape),
        },
    };

    from_payload
        .or_else(|| data.fields.get(key).cloned())
        .or_else(|| default.map(str::to_string))
        .map(BoundValue::Text)
        .ok_or_else(|| BindingError::MissingKey(key.to_string()))
}

/// Interpolate with request data, then built-in date variables.
fn fill(text: &str, data: &RequestData) -> String {
    let builtins = builtin_variables();
    interpolate(text, |name| data.lookup(name).or_else(|| builtins.get(name).cloned()))
}

/// Interpolate a URL, percent-encoding substituted values.
fn fill_url(url: &str, data: &RequestData) -> String {
    let builtins = builtin_variables();
    interpolate(url, |name| {
        data.lookup(name)
            .or_else(|| builtins.get(name).cloned())
            .map(|value| urlencoding::encode(&value).into_owned())
    })
}

/// Interpolate every string inside a JSON body.
fn fill_json(value: &Value, data: &RequestData) -> Value {
    match value {
        Value::String(s) => Value::String(fill(s, data)),
        Value::Array(items) => Value::Array(items.iter().map(|v| fill_json(v, data)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_json(v, data)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Parse a JSON response and pull out a scalar.
fn extract(
    body: &[u8],
    path: Option<&JsonPath>,
    default: Option<&str>,
) -> Result<BoundValue, BindingError> {
    let document: Value =
        serde_json::from_slice(body).map_err(|e| BindingError::InvalidJson(e.to_string()))?;
    let described = path.map(JsonPath::describe).unwrap_or_default();

    let found = match path {
        Some(path) => path.extract(&document),
        None => Some(&document),
    };

    match found {
        Some(Value::String(s)) => Ok(BoundValue::Text(s.clone())),
        Some(Value::Number(n)) => Ok(BoundValue::Text(n.to_string())),
        Some(Value::Bool(b)) => Ok(BoundValue::Text(b.to_string())),
        Some(Value::Null) | None => default
            .map(|d| BoundValue::Text(d.to_string()))
            .ok_or(BindingError::PathNotFound(described)),
        Some(_) => match default {
            Some(d) => Ok(BoundValue::Text(d.to_string())),
            None => Err(BindingError::NotScalar(described)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn resolver() -> BindingResolver {
        BindingResolver::new(DEFAULT_FETCH_TIMEOUT).unwrap()
    }

    fn data(payload: Value) -> RequestData {
        RequestData::new(BTreeMap::new(), Payload::from(payload))
    }

    async fn spawn_server() -> String {
        let app = Router::new()
            .route(
                "/item/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"item": {"id": id, "tags": ["fresh", "cold"], "stock": 4}}))
                }),
            )
            .route(
                "/echo",
                post(|Json(body): Json<Value>| async move { Json(json!({"echo": body})) }),
            )
            .route(
                "/api/stock/products/by-barcode/:code",
                get(|Path(code): Path<String>, headers: HeaderMap| async move {
                    if headers.get("GROCY-API-KEY").and_then(|v| v.to_str().ok()) != Some("secret") {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({"product": {"name": format!("Product {}", code)}})))
                }),
            )
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/text", get(|| async { "not json" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_literal_and_missing_binding() {
        let r = resolver();
        let literal = Binding::Literal { value: "Hi".into() };
        assert_eq!(
            r.resolve(Some(&literal), &RequestData::default()).await.unwrap(),
            BoundValue::Text("Hi".into())
        );
        assert_eq!(
            r.resolve(None, &RequestData::default()).await.unwrap(),
            BoundValue::Empty
        );
    }

    #[tokio::test]
    async fn test_indexed_binding() {
        let r = resolver();
        let d = data(json!(["zero", "one"]));
        let binding = Binding::Indexed { index: 1 };
        assert_eq!(
            r.resolve(Some(&binding), &d).await.unwrap(),
            BoundValue::Text("one".into())
        );
        let out_of_range = Binding::Indexed { index: 9 };
        assert_eq!(
            r.resolve(Some(&out_of_range), &d).await.unwrap_err(),
            BindingError::IndexOutOfRange { index: 9, len: 2 }
        );
    }

    #[tokio::test]
    async fn test_keyed_binding_chain() {
        let r = resolver();
        let d = data(json!({"name": "Milk"})).with_field("origin", "Farm");
        let keyed = |key: &str, default: Option<&str>| Binding::Keyed {
            key: key.into(),
            default: default.map(String::from),
        };

        assert_eq!(
            r.resolve(Some(&keyed("name", None)), &d).await.unwrap(),
            BoundValue::Text("Milk".into())
        );
        assert_eq!(
            r.resolve(Some(&keyed("origin", None)), &d).await.unwrap(),
            BoundValue::Text("Farm".into())
        );
        assert_eq!(
            r.resolve(Some(&keyed("price", Some("n/a"))), &d).await.unwrap(),
            BoundValue::Text("n/a".into())
        );
        assert_eq!(
            r.resolve(Some(&keyed("price", None)), &d).await.unwrap_err(),
            BindingError::MissingKey("price".into())
        );

        let seq = data(json!(["a"]));
        assert!(matches!(
            r.resolve(Some(&keyed("name", Some("x"))), &seq).await.unwrap_err(),
            BindingError::ShapeMismatch { expected: "mapping", .. }
        ));
    }

    #[tokio::test]
    async fn test_template_binding() {
        let r = resolver();
        let d = data(json!({"name": "Milk"}));
        let binding = Binding::Template {
            template: "{{name}} ({{year}}) {{nope}}".into(),
        };
        let BoundValue::Text(text) = r.resolve(Some(&binding), &d).await.unwrap() else {
            panic!("expected text");
        };
        assert!(text.starts_with("Milk ("));
        assert!(text.ends_with(") {{nope}}"));
    }

    #[tokio::test]
    async fn test_remote_get_with_path() {
        let base = spawn_server().await;
        let r = resolver();
        let d = data(json!({"id": "a b"}));
        let binding = Binding::Remote(RemoteBinding {
            url: format!("{}/item/{{{{id}}}}", base),
            method: HttpMethod::Get,
            body: None,
            headers: BTreeMap::new(),
            path: Some(JsonPath::Dotted("item.id".into())),
            default: None,
            timeout_ms: None,
        });
        assert_eq!(
            r.resolve(Some(&binding), &d).await.unwrap(),
            BoundValue::Text("a b".into())
        );
    }

    #[tokio::test]
    async fn test_remote_post_and_missing_path() {
        let base = spawn_server().await;
        let r = resolver();
        let d = data(json!({"name": "Milk"}));
        let mut remote = RemoteBinding {
            url: format!("{}/echo", base),
            method: HttpMethod::Post,
            body: Some(json!({"q": "{{name}}"})),
            headers: BTreeMap::new(),
            path: Some(JsonPath::Dotted("echo.q".into())),
            default: None,
            timeout_ms: None,
        };
        assert_eq!(
            r.resolve(Some(&Binding::Remote(remote.clone())), &d).await.unwrap(),
            BoundValue::Text("Milk".into())
        );

        remote.path = Some(JsonPath::Dotted("echo.missing".into()));
        assert_eq!(
            r.resolve(Some(&Binding::Remote(remote.clone())), &d).await.unwrap_err(),
            BindingError::PathNotFound("echo.missing".into())
        );

        remote.default = Some("fallback".into());
        assert_eq!(
            r.resolve(Some(&Binding::Remote(remote)), &d).await.unwrap(),
            BoundValue::Text("fallback".into())
        );
    }

    #[tokio::test]
    async fn test_remote_errors() {
        let base = spawn_server().await;
        let r = resolver();
        let remote = |path: &str| {
            Binding::Remote(RemoteBinding {
                url: format!("{}{}", base, path),
                method: HttpMethod::Get,
                body: None,
                headers: BTreeMap::new(),
                path: None,
                default: None,
                timeout_ms: Some(200),
            })
        };

        assert!(matches!(
            r.resolve(Some(&remote("/broken")), &RequestData::default()).await.unwrap_err(),
            BindingError::HttpStatus { status: 500, .. }
        ));
        assert!(matches!(
            r.resolve(Some(&remote("/text")), &RequestData::default()).await.unwrap_err(),
            BindingError::InvalidJson(_)
        ));

        let started = std::time::Instant::now();
        assert!(matches!(
            r.resolve(Some(&remote("/slow")), &RequestData::default()).await.unwrap_err(),
            BindingError::Timeout { timeout_ms: 200, .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connectivity_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let binding = Binding::Download {
            url: format!("http://{}/gone", addr),
            timeout_ms: Some(1_000),
        };
        assert!(matches!(
            resolver().resolve(Some(&binding), &RequestData::default()).await.unwrap_err(),
            BindingError::Connectivity { .. }
        ));
    }

    #[tokio::test]
    async fn test_inventory_lookup() {
        let base = spawn_server().await;
        let r = resolver();
        let d = RequestData::default().with_field("barcode", "4011");
        let mut inventory = InventoryBinding {
            base_url: format!("{}/", base),
            barcode: "{{barcode}}".into(),
            field: "product.name".into(),
            api_key: Some("secret".into()),
            default: None,
            timeout_ms: None,
        };
        assert_eq!(
            r.resolve(Some(&Binding::Inventory(inventory.clone())), &d).await.unwrap(),
            BoundValue::Text("Product 4011".into())
        );

        inventory.api_key = None;
        assert!(matches!(
            r.resolve(Some(&Binding::Inventory(inventory)), &d).await.unwrap_err(),
            BindingError::HttpStatus { status: 401, .. }
        ));
    }
}
