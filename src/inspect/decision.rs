//! Decision round trip to the policy service.
//!
//! One POST per inbound request, bounded by the configured timeout. The
//! timer and the call race over a shared [`CancellationSource`]: the timer
//! cancels the source when it fires, and the [`Deadline`] guard clears the
//! timer whenever the call settles first.
//!
//! Every failure is folded into [`DecisionOutcome::Inconclusive`]. Nothing
//! here returns an error to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::config::InspectorConfig;
use super::redact::OutboundPayload;

// ── Cancellation ──────────────────────────────────────────────────────────────

/// A one-shot cancellation flag shared by the deadline timer and the call.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Clone, Debug)]
pub struct CancellationSource {
    flag: Arc<watch::Sender<bool>>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called, immediately if
    /// it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSource {
    fn default() -> Self { Self::new() }
}

/// Armed timer that cancels its source after `timeout`.
///
/// Dropping the guard aborts the timer, so it never outlives the call.
#[derive(Debug)]
pub struct Deadline {
    timer: JoinHandle<()>,
}

impl Deadline {
    pub fn arm(timeout: Duration, source: CancellationSource) -> Self {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            source.cancel();
        });
        Self { timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

// ── Transport seam ────────────────────────────────────────────────────────────

/// Status and body of a completed policy-service exchange.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,
    #[error("network: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The HTTP client used to reach the policy service.
///
/// Implementations POST `body` to `endpoint` with
/// `Content-Type: application/json` and must stop waiting, returning
/// [`TransportError::Cancelled`], once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
        cancel: &CancellationSource,
    ) -> Result<TransportResponse, TransportError>;
}

// ── Verdict ───────────────────────────────────────────────────────────────────

/// The `action` field of a verdict. Only [`Action::Block`] denies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Block,
    Allow,
    /// A string the middleware does not recognize.
    Other(String),
    /// No `action` field, or an explicit `null`.
    Missing,
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "block" => Self::Block,
            "allow" => Self::Allow,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Parsed policy-service response: `{"action": string, "requestID": string}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub action: Action,
    pub request_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("body is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("body is not a JSON object")]
    NotObject,
    #[error("field `{0}` is not a string")]
    NotString(&'static str),
}

impl Verdict {
    /// Strict parse: the body must be a JSON object and `action` /
    /// `requestID`, when present and non-null, must be strings. Unknown
    /// fields are ignored.
    pub fn parse(body: &[u8]) -> Result<Self, VerdictError> {
        let Value::Object(fields) = serde_json::from_slice::<Value>(body)? else {
            return Err(VerdictError::NotObject);
        };
        let action = match optional_str(fields.get("action"), "action")? {
            Some(s) => Action::from(s),
            None => Action::Missing,
        };
        let request_id = optional_str(fields.get("requestID"), "requestID")?.map(str::to_owned);
        Ok(Self { action, request_id })
    }

    pub fn is_block(&self) -> bool {
        self.action == Action::Block
    }
}

fn optional_str<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<Option<&'a str>, VerdictError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(VerdictError::NotString(field)),
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Why no verdict was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InconclusiveReason {
    Timeout,
    NetworkError,
    NonSuccessStatus(StatusCode),
    MalformedResponse,
}

/// Result of one decision round trip. Built per request, consumed at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    Verdict(Verdict),
    Inconclusive(InconclusiveReason),
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Sends decision requests over a [`Transport`] under the configured deadline.
#[derive(Clone)]
pub struct DecisionClient {
    config: Arc<InspectorConfig>,
    transport: Arc<dyn Transport>,
}

impl DecisionClient {
    pub fn new(config: Arc<InspectorConfig>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Exactly one outbound call, no retry.
    pub async fn decide(&self, payload: &OutboundPayload) -> DecisionOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode decision payload");
                return DecisionOutcome::Inconclusive(InconclusiveReason::NetworkError);
            }
        };

        let cancel = CancellationSource::new();
        let deadline = Deadline::arm(self.config.timeout(), cancel.clone());

        let result = tokio::select! {
            biased;
            res = self.transport.post_json(self.config.endpoint(), body, &cancel) => res,
            // Covers transports that do not watch the token themselves.
            () = cancel.cancelled() => Err(TransportError::Cancelled),
        };
        drop(deadline);

        self.classify(result, cancel.is_cancelled())
    }

    fn classify(
        &self,
        result: Result<TransportResponse, TransportError>,
        timed_out: bool,
    ) -> DecisionOutcome {
        let response = match result {
            Ok(response) => response,
            Err(_) if timed_out => {
                debug!(
                    timeout_ms = self.config.timeout().as_millis() as u64,
                    "policy decision timed out"
                );
                return DecisionOutcome::Inconclusive(InconclusiveReason::Timeout);
            }
            Err(e) => {
                error!(error = %e, endpoint = %self.config.endpoint(), "policy request failed");
                return DecisionOutcome::Inconclusive(InconclusiveReason::NetworkError);
            }
        };

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "policy service returned non-success status");
            return DecisionOutcome::Inconclusive(InconclusiveReason::NonSuccessStatus(response.status));
        }

        match Verdict::parse(&response.body) {
            Ok(verdict) => {
                if let Action::Other(action) = &verdict.action {
                    debug!(action = %action, "unrecognized verdict action, allowing");
                }
                DecisionOutcome::Verdict(verdict)
            }
            Err(e) => {
                warn!(error = %e, "malformed policy response");
                DecisionOutcome::Inconclusive(InconclusiveReason::MalformedResponse)
            }
        }
    }
}
