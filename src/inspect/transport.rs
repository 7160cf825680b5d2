//! Default [`Transport`] over `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};

use super::decision::{CancellationSource, Transport, TransportError, TransportResponse};
use crate::error::ConfigError;

/// Posts decision requests with a shared connection pool.
///
/// Redirects are not followed. There is no client-level timeout: the
/// decision deadline bounds the whole exchange, body read included.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// [`ConfigError::Client`] when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ConfigError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("barricade/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Reuses an existing client, e.g. one shared with the rest of the host.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
        cancel: &CancellationSource,
    ) -> Result<TransportResponse, TransportError> {
        let exchange = async {
            let res = self.client
                .post(endpoint.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(network)?;
            let status = res.status();
            // A non-success reply is classified on status alone.
            let body = if status.is_success() {
                res.bytes().await.map_err(network)?
            } else {
                Bytes::new()
            };
            Ok::<_, TransportError>(TransportResponse { status, body })
        };

        // Dropping `exchange` aborts the in-flight request.
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            res = exchange => res,
        }
    }
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(Box::new(e))
}
