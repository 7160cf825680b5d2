//! # barricade
//!
//! Request-inspection middleware for a minimal async HTTP framework. Every
//! inbound request is described to a remote policy service, which answers
//! block or allow. Blocked requests get a 403 denial page; everything else
//! proceeds.
//!
//! ## The contract
//!
//! The policy service decides. barricade carries the question and enforces
//! the answer, and it never lets the service's health decide availability:
//!
//! - **Bounded latency**: each decision has a deadline (100 ms default)
//! - **Fail-open**: timeouts, network errors, non-2xx replies and
//!   unreadable bodies all let the request through
//! - **Redaction**: configured header names and body fields never leave
//!   the process
//! - **One call**: no retries, no queueing, no batching
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use barricade::inspect::{Inspector, InspectorConfig};
//! use barricade::middleware::Trace;
//! use barricade::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inspector = Inspector::new(
//!         InspectorConfig::builder()
//!             .exclude_headers(["authorization"])
//!             .exclude_body(["password"])
//!             .build()?,
//!     )?;
//!
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .layer(Trace)
//!         .layer(inspector);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await?;
//!     Ok(())
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod inspect;
pub mod middleware;

pub use error::{ConfigError, Error};
pub use handler::{BoxFuture, Handler};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
