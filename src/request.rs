//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use serde_json::Value;

/// An incoming HTTP request with its body fully collected.
///
/// Header names are normalized to lowercase by `http::HeaderMap`.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
        }
    }

    /// Builder for requests constructed outside the server (tests, embedders).
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Path plus query string, as it appeared on the request line.
    pub fn url(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    /// Case-insensitive header lookup. Returns `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The parsed body, when the request declares a JSON content type and the
    /// bytes parse. Anything else (no body, form data, malformed JSON) is `None`.
    pub fn json_body(&self) -> Option<Value> {
        if self.body.is_empty() || !self.is_json() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    fn is_json(&self) -> bool {
        let Some(ct) = self.header(CONTENT_TYPE.as_str()) else {
            return false;
        };
        let essence = ct.split(';').next().unwrap_or("").trim();
        essence.eq_ignore_ascii_case("application/json")
            || essence.to_ascii_lowercase().ends_with("+json")
    }
}

/// Fluent builder for [`Request`]. Invalid header names or values are skipped.
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request target. An unparseable target leaves `/` in place.
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = uri;
        }
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Terminates with a JSON body and the matching content type.
    pub fn json(self, body: &Value) -> Request {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.header(CONTENT_TYPE.as_str(), "application/json").body(bytes)
    }

    pub fn body(self, body: impl Into<Bytes>) -> Request {
        Request {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: body.into(),
            params: HashMap::new(),
        }
    }

    pub fn finish(self) -> Request {
        self.body(Bytes::new())
    }
}
