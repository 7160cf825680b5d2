//! Projection of an inbound request into the decision payload.

use std::collections::BTreeMap;
use std::collections::HashSet;

use http::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::config::InspectorConfig;
use crate::request::Request;

/// Sanitized description of one inbound request, in the policy service's
/// wire shape: `{"method", "url", "headers", "body"}`.
///
/// Owns all of its data. An absent body is omitted from the JSON.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutboundPayload {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl OutboundPayload {
    /// Applies the configured exclusions to an existing payload.
    pub fn redacted(mut self, config: &InspectorConfig) -> Self {
        let excluded = config.exclude_headers();
        if !excluded.is_empty() {
            self.headers.retain(|k, _| !excluded.contains(k));
        }
        self.body = self.body.map(|body| project_body(config.exclude_body(), body));
        self
    }
}

/// Builds the payload for `req`, dropping excluded header names and body
/// fields. Matching is exact: header names as the host normalized them
/// (lowercase), body field names case-sensitively.
pub fn redact(config: &InspectorConfig, req: &Request) -> OutboundPayload {
    OutboundPayload {
        method: req.method().as_str().to_owned(),
        url: req.url().to_owned(),
        headers: project_headers(config.exclude_headers(), req.headers()),
        body: req.json_body().map(|body| project_body(config.exclude_body(), body)),
    }
}

/// Repeated headers collapse into one comma-separated value.
fn project_headers(excluded: &HashSet<String>, headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if excluded.contains(name.as_str()) {
            continue;
        }
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_owned())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

/// Only top-level object fields are subject to exclusion; any other JSON
/// value passes through untouched.
fn project_body(excluded: &HashSet<String>, body: Value) -> Value {
    match body {
        Value::Object(fields) if !excluded.is_empty() => Value::Object(
            fields.into_iter()
                .filter(|(k, _)| !excluded.contains(k))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;

    use super::*;

    fn login() -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/login?next=%2Fhome")
            .header("user-agent", "test-agent")
            .header("authorization", "Bearer token")
            .header("x-secret", "supersecret")
            .json(&json!({"username": "user1", "password": "supersecret", "Password": "kept"}))
    }

    #[test]
    fn no_exclusions_forward_everything() {
        let payload = redact(&InspectorConfig::default(), &login());
        assert_eq!(payload.method, "POST");
        assert_eq!(payload.url, "/login?next=%2Fhome");
        assert_eq!(payload.headers["authorization"], "Bearer token");
        assert_eq!(payload.headers["user-agent"], "test-agent");
        assert_eq!(
            payload.body,
            Some(json!({"username": "user1", "password": "supersecret", "Password": "kept"}))
        );
    }

    #[test]
    fn excluded_headers_are_dropped() {
        let config = InspectorConfig::builder()
            .exclude_headers(["x-secret", "authorization"])
            .build()
            .unwrap();
        let payload = redact(&config, &login());
        assert!(!payload.headers.contains_key("x-secret"));
        assert!(!payload.headers.contains_key("authorization"));
        assert_eq!(payload.headers["user-agent"], "test-agent");
    }

    #[test]
    fn body_exclusion_is_case_sensitive() {
        let config = InspectorConfig::builder().exclude_body(["password"]).build().unwrap();
        let payload = redact(&config, &login());
        assert_eq!(payload.body, Some(json!({"username": "user1", "Password": "kept"})));
    }

    #[test]
    fn absent_body_stays_absent() {
        let config = InspectorConfig::builder().exclude_body(["password"]).build().unwrap();
        let payload = redact(&config, &Request::builder().uri("/foo").finish());
        assert_eq!(payload.body, None);
        let wire = serde_json::to_value(&payload).unwrap();
        assert!(wire.get("body").is_none());
    }

    #[test]
    fn non_object_body_passes_through() {
        let config = InspectorConfig::builder().exclude_body(["0"]).build().unwrap();
        let req = Request::builder()
            .method(Method::POST)
            .json(&json!(["a", "b"]));
        assert_eq!(redact(&config, &req).body, Some(json!(["a", "b"])));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let req = Request::builder()
            .header("accept", "text/html")
            .header("accept", "application/json")
            .finish();
        let payload = redact(&InspectorConfig::default(), &req);
        assert_eq!(payload.headers["accept"], "text/html, application/json");
    }

    #[test]
    fn wire_shape() {
        let req = Request::builder().uri("/foo").header("user-agent", "ua").finish();
        let wire = serde_json::to_value(redact(&InspectorConfig::default(), &req)).unwrap();
        assert_eq!(wire, json!({"method": "GET", "url": "/foo", "headers": {"user-agent": "ua"}}));
    }
}
