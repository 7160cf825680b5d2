//! Remote request inspection.
//!
//! Each request runs three steps as one unit of work:
//!
//! ```text
//! Request ─▶ redact ─▶ DecisionClient::decide ─▶ enforce ─▶ next.run(req)
//!                         (bounded by timeout)         └──▶ 403 denial page
//! ```
//!
//! The only suspension point is the decision call. Configuration is the
//! only state shared between requests and it is read-only.
//!
//! ```rust,no_run
//! use barricade::inspect::{Inspector, InspectorConfig};
//! use barricade::{Request, Router, Server};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InspectorConfig::builder()
//!     .exclude_headers(["authorization", "cookie"])
//!     .exclude_body(["password"])
//!     .timeout(Duration::from_millis(150))
//!     .build()?;
//!
//! let app = Router::new()
//!     .get("/", |_req: Request| async { "hello" })
//!     .layer(Inspector::new(config)?);
//!
//! Server::bind("0.0.0.0:3000")?.serve(app).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod decision;
mod enforce;
mod redact;
mod transport;

use std::sync::Arc;

use tracing::info;

use crate::error::ConfigError;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

pub use config::{
    DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, ExcludeKeys, InspectorConfig, InspectorConfigBuilder,
    InspectorOptions,
};
pub use decision::{
    Action, CancellationSource, Deadline, DecisionClient, DecisionOutcome, InconclusiveReason,
    Transport, TransportError, TransportResponse, Verdict, VerdictError,
};
pub use enforce::{EnforcementAction, deny_response, enforce};
pub use redact::{OutboundPayload, redact};
pub use transport::ReqwestTransport;

/// Middleware that asks the policy service about every request.
///
/// Never fails the request on its own account: timeouts, network errors,
/// error statuses and unreadable replies all let the request through.
#[derive(Clone)]
pub struct Inspector {
    config: Arc<InspectorConfig>,
    client: DecisionClient,
}

impl Inspector {
    /// Inspector backed by the default [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Client`] when the HTTP client cannot be built.
    pub fn new(config: InspectorConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_transport(config, ReqwestTransport::new()?))
    }

    pub fn with_transport(config: InspectorConfig, transport: impl Transport) -> Self {
        let config = Arc::new(config);
        let client = DecisionClient::new(Arc::clone(&config), Arc::new(transport));
        Self { config, client }
    }

    /// # Errors
    ///
    /// Any [`ConfigError`] from validating `options` or building the client.
    pub fn from_options(options: InspectorOptions) -> Result<Self, ConfigError> {
        Self::new(InspectorConfig::try_from(options)?)
    }

    pub fn config(&self) -> &InspectorConfig { &self.config }

    /// Redact, decide, enforce. Does not touch `req`.
    pub async fn inspect(&self, req: &Request) -> EnforcementAction {
        let payload = redact(&self.config, req);
        let outcome = self.client.decide(&payload).await;
        enforce(&outcome)
    }
}

impl Middleware for Inspector {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin(async move {
            match self.inspect(&req).await {
                EnforcementAction::Continue => next.run(req).await,
                EnforcementAction::Deny { request_id } => {
                    info!(request_id = %request_id, method = %req.method(), path = %req.path(), "request denied");
                    deny_response(&request_id)
                }
            }
        })
    }
}
