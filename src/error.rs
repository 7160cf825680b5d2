//! Unified error types.
//!
//! Application-level outcomes (404, 403 denials) are [`Response`](crate::Response)
//! values, not errors. Policy-service failures are not errors either: they
//! resolve to [`InconclusiveReason`](crate::inspect::InconclusiveReason) and
//! the request proceeds. What remains is infrastructure and construction.

use thiserror::Error;

/// Errors from binding and serving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid socket address `{0}`")]
    Addr(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building an [`InspectorConfig`](crate::inspect::InspectorConfig)
/// or the transport that talks to the policy service.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("decision timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid decision endpoint `{url}`: {reason}")]
    Endpoint { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
