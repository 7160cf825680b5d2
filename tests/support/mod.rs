#![allow(dead_code)]

use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use barricade::inspect::{Inspector, InspectorConfig, InspectorConfigBuilder, ReqwestTransport};
use barricade::{Request, Router};
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One decision request as the policy service saw it.
#[derive(Clone, Debug)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub payload: Value,
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: Arc<str>,
    delay: Duration,
}

/// Local stand-in for the policy service.
pub struct PolicyService {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

impl PolicyService {
    pub async fn json(status: u16, body: &str) -> Self {
        Self::spawn(status, body, Duration::ZERO).await
    }

    pub async fn status(status: u16) -> Self {
        Self::spawn(status, "", Duration::ZERO).await
    }

    pub async fn delayed(delay: Duration, body: &str) -> Self {
        Self::spawn(200, body, delay).await
    }

    async fn spawn(status: u16, body: &str, delay: Duration) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body: Arc::from(body),
            delay,
        };
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let reply = reply.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let svc = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                        let reply = reply.clone();
                        let log = Arc::clone(&log);
                        async move { Ok::<_, Infallible>(answer(req, reply, log).await) }
                    });
                    let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), svc).await;
                });
            }
        });

        Self { addr, received, handle }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// The single payload received so far.
    pub fn only_payload(&self) -> Value {
        let received = self.received();
        assert_eq!(received.len(), 1, "expected exactly one decision request");
        received[0].payload.clone()
    }
}

impl Drop for PolicyService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn answer(
    req: hyper::Request<hyper::body::Incoming>,
    reply: Reply,
    log: Arc<Mutex<Vec<Received>>>,
) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let bytes = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
    log.lock().unwrap().push(Received {
        method: parts.method.to_string(),
        path: parts.uri.path().to_owned(),
        content_type: parts.headers.get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        payload: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    });

    tokio::time::sleep(reply.delay).await;

    let mut res = http::Response::new(Full::new(Bytes::from(reply.body.to_string())));
    *res.status_mut() = reply.status;
    res.headers_mut().insert("content-type", "application/json".parse().unwrap());
    res
}

/// Builder pointed at `endpoint`, to be finished by the test.
pub fn config_for(endpoint: &str) -> InspectorConfigBuilder {
    InspectorConfig::builder().endpoint(endpoint)
}

pub fn inspector(config: InspectorConfig) -> Inspector {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    Inspector::with_transport(config, ReqwestTransport::with_client(client))
}

async fn bar(_req: Request) -> &'static str {
    "bar"
}

/// The protected application: `GET /foo` and `POST /foo` answer `bar`.
pub fn app(config: InspectorConfig) -> Router {
    Router::new()
        .get("/foo", bar)
        .post("/foo", bar)
        .layer(inspector(config))
}
