//! Inspector configuration.
//!
//! Built once, then shared read-only by every request through an `Arc`.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;

/// Round-trip budget used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// The hosted policy service.
pub const DEFAULT_ENDPOINT: &str = "https://waf.barricade.cloud/";

/// Immutable inspector settings.
///
/// # Invariants
/// - `timeout` is strictly positive.
/// - `endpoint` is an absolute `http` or `https` URL.
#[derive(Clone, Debug)]
pub struct InspectorConfig {
    exclude_headers: HashSet<String>,
    exclude_body: HashSet<String>,
    timeout: Duration,
    endpoint: Url,
    api_key: Option<String>,
}

impl InspectorConfig {
    pub fn builder() -> InspectorConfigBuilder {
        InspectorConfigBuilder::default()
    }

    /// Header names never forwarded to the policy service.
    pub fn exclude_headers(&self) -> &HashSet<String> { &self.exclude_headers }

    /// Body field names never forwarded to the policy service.
    pub fn exclude_body(&self) -> &HashSet<String> { &self.exclude_body }

    pub fn timeout(&self) -> Duration { self.timeout }
    pub fn endpoint(&self) -> &Url { &self.endpoint }

    /// Key supplied by the host at construction. Kept for the embedder; it is
    /// not part of the decision request.
    pub fn api_key(&self) -> Option<&str> { self.api_key.as_deref() }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            exclude_headers: HashSet::new(),
            exclude_body: HashSet::new(),
            timeout: DEFAULT_TIMEOUT,
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).unwrap_or_else(|e| unreachable!("static endpoint: {e}"))
}

/// Fluent builder for [`InspectorConfig`].
#[derive(Debug, Default)]
pub struct InspectorConfigBuilder {
    exclude_headers: HashSet<String>,
    exclude_body: HashSet<String>,
    timeout: Option<Duration>,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl InspectorConfigBuilder {
    pub fn exclude_headers<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_headers.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn exclude_body<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_body.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::ZeroTimeout`] for a zero timeout,
    /// [`ConfigError::Endpoint`] for a URL that is not absolute http(s).
    pub fn build(self) -> Result<InspectorConfig, ConfigError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let endpoint = match self.endpoint {
            Some(raw) => parse_endpoint(&raw)?,
            None => default_endpoint(),
        };
        Ok(InspectorConfig {
            exclude_headers: self.exclude_headers,
            exclude_body: self.exclude_body,
            timeout,
            endpoint,
            api_key: self.api_key,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Endpoint { url: raw.to_owned(), reason };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}

// ── Host-supplied options ─────────────────────────────────────────────────────

/// Construction options as a host hands them over, e.g. from a JSON or YAML
/// settings file:
///
/// ```json
/// { "apiKey": "…", "excludeKeys": { "headers": ["authorization"], "body": ["password"] }, "timeout": 250 }
/// ```
///
/// Missing lists exclude nothing. A missing or zero `timeout` means the
/// 100 ms default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorOptions {
    pub api_key: Option<String>,
    pub exclude_keys: ExcludeKeys,
    /// Milliseconds.
    pub timeout: Option<u64>,
    /// Overrides the hosted policy service.
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExcludeKeys {
    pub headers: Vec<String>,
    pub body: Vec<String>,
}

impl TryFrom<InspectorOptions> for InspectorConfig {
    type Error = ConfigError;

    fn try_from(options: InspectorOptions) -> Result<Self, Self::Error> {
        let mut builder = Self::builder()
            .exclude_headers(options.exclude_keys.headers)
            .exclude_body(options.exclude_keys.body);
        if let Some(ms) = options.timeout.filter(|ms| *ms > 0) {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(endpoint) = options.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(key) = options.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = InspectorConfig::builder().build().unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(100));
        assert_eq!(config.endpoint().as_str(), DEFAULT_ENDPOINT);
        assert!(config.exclude_headers().is_empty());
        assert!(config.exclude_body().is_empty());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = InspectorConfig::builder().timeout(Duration::ZERO).build().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }

    #[test]
    fn endpoint_must_be_http() {
        let err = InspectorConfig::builder().endpoint("ftp://example.com/").build().unwrap_err();
        assert!(matches!(err, ConfigError::Endpoint { .. }));
        let err = InspectorConfig::builder().endpoint("not a url").build().unwrap_err();
        assert!(matches!(err, ConfigError::Endpoint { .. }));
    }

    #[test]
    fn options_from_json() {
        let options: InspectorOptions = serde_json::from_str(
            r#"{"apiKey":"foo","excludeKeys":{"headers":["x-secret"],"body":["password"]},"timeout":200}"#,
        )
        .unwrap();
        let config = InspectorConfig::try_from(options).unwrap();
        assert!(config.exclude_headers().contains("x-secret"));
        assert!(config.exclude_body().contains("password"));
        assert_eq!(config.timeout(), Duration::from_millis(200));
        assert_eq!(config.api_key(), Some("foo"));
    }

    #[test]
    fn empty_options_mean_defaults() {
        let options: InspectorOptions = serde_json::from_str(r#"{"excludeKeys":{},"timeout":0}"#).unwrap();
        let config = InspectorConfig::try_from(options).unwrap();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.exclude_headers().is_empty());
    }
}
