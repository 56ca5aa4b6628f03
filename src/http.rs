//! Shared HTTP client for the back-office REST API.
//!
//! # Security Note - Logging
//!
//! The bearer token is attached through the `RedactedHeader` wrapper, whose
//! `Display` and `Debug` print `[REDACTED]`. Keep `RUST_LOG=reqwest=debug`
//! off in production all the same: other request details may be logged.
//!
//! Every call is attempted exactly once. Failures are classified into
//! [`BackofficeError::Request`], [`BackofficeError::Network`] and
//! [`BackofficeError::Auth`] and returned to the caller immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use reqwest::header;
use reqwest::multipart;
use serde_json::{Map, Value};
use url::Url;

use crate::auth::AuthSession;
use crate::error::{BackofficeError, Result};

/// Query parameter asking the backend to treat a multipart POST as a PUT.
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

/// A file sent as part of a multipart create/update.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FilePart {
    /// Guess the content type from the file extension.
    pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
        let ext = file_name.rsplit_once('.')?.1.to_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            "pdf" => Some("application/pdf"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        fields: Map<String, Value>,
        files: Vec<FilePart>,
    },
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, without a leading slash, e.g. `products/12`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, fields: Map<String, Value>, files: Vec<FilePart>) -> Self {
        self.body = RequestBody::Multipart { fields, files };
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The method the backend should apply, honouring `_method` overrides.
    pub fn effective_method(&self) -> Method {
        if self.method == Method::POST
            && let Some(m) = self.query_value(METHOD_OVERRIDE_PARAM)
            && let Ok(method) = Method::from_bytes(m.to_uppercase().as_bytes())
        {
            return method;
        }
        self.method.clone()
    }
}

/// Sends API requests and returns the decoded JSON body.
///
/// Implementations must map failures onto the error taxonomy: 401 is
/// [`BackofficeError::Auth`], other rejections are
/// [`BackofficeError::Request`], missing responses are
/// [`BackofficeError::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Wrapper for sensitive header values that redacts the value when formatted.
struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &str) -> Self {
        Self {
            value: format!("Bearer {token}"),
        }
    }

    fn as_header_value(&self) -> Result<header::HeaderValue> {
        let mut value = header::HeaderValue::from_str(&self.value).map_err(|_| {
            BackofficeError::Config("session token contains invalid characters".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Pull a human readable message out of an error body.
///
/// Looks at `message`, then `error`, then the first entry of `errors`
/// (either a list or a field → list-of-messages map).
pub fn extract_message(body: &Value) -> Option<String> {
    let text = |v: &Value| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

    if let Some(m) = body.get("message").and_then(text) {
        return Some(m);
    }
    if let Some(m) = body.get("error").and_then(text) {
        return Some(m);
    }
    match body.get("errors")? {
        Value::Array(items) => items.iter().find_map(text),
        Value::Object(map) => map.values().find_map(|v| match v {
            Value::Array(items) => items.iter().find_map(text),
            other => text(other),
        }),
        _ => None,
    }
}

/// Classify an HTTP response into a JSON value or an error.
///
/// The caller is responsible for the session side effect of
/// [`BackofficeError::Auth`].
pub fn classify_response(status: u16, body: &str) -> Result<Value> {
    let parsed: Option<Value> = if body.trim().is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    if status == 401 {
        return Err(BackofficeError::Auth);
    }

    if !(200..300).contains(&status) {
        return Err(match parsed.as_ref().and_then(extract_message) {
            Some(message) => BackofficeError::Request {
                status: Some(status),
                message,
            },
            None => BackofficeError::request_failed(Some(status)),
        });
    }

    let value = match parsed {
        Some(v) => v,
        None if body.trim().is_empty() => Value::Null,
        None => {
            return Err(BackofficeError::UnexpectedResponse(
                "response body is not valid JSON".to_string(),
            ));
        }
    };

    if value.get("status").and_then(Value::as_bool) == Some(false) {
        return Err(match extract_message(&value) {
            Some(message) => BackofficeError::Request {
                status: None,
                message,
            },
            None => BackofficeError::request_failed(None),
        });
    }

    Ok(value)
}

/// The production [`Transport`], backed by `reqwest`.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<AuthSession>,
}

impl HttpClient {
    /// Create a client. The base URL is normalized to end with `/` so that
    /// request paths join below it.
    pub fn new(base_url: &str, timeout: Duration, session: Arc<AuthSession>) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| BackofficeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn build_form(fields: Map<String, Value>, files: Vec<FilePart>) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => if b { "1" } else { "0" }.to_string(),
                other => other.to_string(),
            };
            form = form.text(name, text);
        }
        for file in files {
            let mut part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(ct) = file.content_type {
                part = part.mime_str(&ct).map_err(|e| {
                    BackofficeError::InvalidInput(format!("invalid content type '{ct}': {e}"))
                })?;
            }
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

fn network_error(err: reqwest::Error) -> BackofficeError {
    if err.is_timeout() {
        BackofficeError::Network("request timed out".to_string())
    } else if err.is_connect() {
        BackofficeError::Network(format!("could not connect: {err}"))
    } else {
        BackofficeError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request)?;
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(
                header::ACCEPT,
                header::HeaderValue::from_static("application/json"),
            );

        if let Some(token) = self.session.get() {
            let auth_header = RedactedHeader::bearer(&token);
            builder = builder.header(header::AUTHORIZATION, auth_header.as_header_value()?);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart { fields, files } => {
                builder.multipart(Self::build_form(fields, files)?)
            }
        };

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;

        let result = classify_response(status, &body);
        match &result {
            Err(BackofficeError::Auth) => {
                tracing::warn!("backend rejected the session token, signing out");
                self.session.expire();
            }
            Err(e) => tracing::debug!(status, "request failed: {e}"),
            Ok(_) => {}
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(
            extract_message(&json!({"message": "Name taken"})).as_deref(),
            Some("Name taken")
        );
        assert_eq!(
            extract_message(&json!({"error": "Forbidden"})).as_deref(),
            Some("Forbidden")
        );
        assert_eq!(
            extract_message(&json!({"errors": {"sku": ["SKU must be unique"]}})).as_deref(),
            Some("SKU must be unique")
        );
        assert_eq!(
            extract_message(&json!({"errors": ["first", "second"]})).as_deref(),
            Some("first")
        );
        assert_eq!(extract_message(&json!({"message": "  "})), None);
        assert_eq!(extract_message(&json!({"data": []})), None);
    }

    #[test]
    fn test_classify_success() {
        let value = classify_response(200, r#"{"status":true,"data":[]}"#).unwrap();
        assert_eq!(value["data"], json!([]));
        assert_eq!(classify_response(204, "").unwrap(), Value::Null);
    }

    #[test]
    fn test_classify_401_is_auth() {
        assert!(matches!(
            classify_response(401, r#"{"message":"Unauthenticated."}"#),
            Err(BackofficeError::Auth)
        ));
    }

    #[test]
    fn test_classify_error_with_message() {
        match classify_response(422, r#"{"message":"The name field is required."}"#) {
            Err(BackofficeError::Request { status, message }) => {
                assert_eq!(status, Some(422));
                assert_eq!(message, "The name field is required.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_without_message() {
        match classify_response(500, "<html>oops</html>") {
            Err(BackofficeError::Request { status, message }) => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "request failed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_status_false_body() {
        match classify_response(200, r#"{"status":false,"message":"Out of stock"}"#) {
            Err(BackofficeError::Request { status, message }) => {
                assert_eq!(status, None);
                assert_eq!(message, "Out of stock");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_invalid_json_success() {
        assert!(matches!(
            classify_response(200, "not json"),
            Err(BackofficeError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_effective_method_override() {
        let req = ApiRequest::post("products/4").query(METHOD_OVERRIDE_PARAM, "PUT");
        assert_eq!(req.effective_method(), Method::PUT);
        assert_eq!(ApiRequest::post("products").effective_method(), Method::POST);
        assert_eq!(ApiRequest::delete("products/4").effective_method(), Method::DELETE);
    }

    #[test]
    fn test_url_for_joins_below_base() {
        let session = Arc::new(AuthSession::in_memory());
        let client =
            HttpClient::new("https://api.example.com/v1", Duration::from_secs(30), session)
                .unwrap();
        let url = client
            .url_for(
                &ApiRequest::get("/products")
                    .query("page", 2)
                    .query("search", "tea leaf"),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/products?page=2&search=tea+leaf"
        );
    }

    #[test]
    fn test_redacted_header_never_prints_token() {
        let header = RedactedHeader::bearer("abc");
        assert_eq!(header.to_string(), "[REDACTED]");
        assert!(!format!("{header:?}").contains("abc"));
        assert!(header.as_header_value().unwrap().is_sensitive());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(FilePart::guess_content_type("a.PNG"), Some("image/png"));
        assert_eq!(FilePart::guess_content_type("photo.jpeg"), Some("image/jpeg"));
        assert_eq!(FilePart::guess_content_type("noext"), None);
    }
}
