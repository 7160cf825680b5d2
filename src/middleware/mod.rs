//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request inspection, and
//! authentication-header checks.
//!
//! A middleware receives the request by value together with a [`Next`]. It
//! either calls [`Next::run`] to hand control down the chain, or returns its
//! own [`Response`] to short-circuit it. Layers run outer-first, in the order
//! they were registered with [`Router::layer`](crate::Router::layer).
//!
//! Built-in middleware:
//! - [`Trace`]: per-request span with method, path, status, latency
//! - [`Inspector`](crate::inspect::Inspector): remote block/allow decision

mod trace;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;

pub use trace::Trace;

/// A layer in the request pipeline.
///
/// ```rust
/// use barricade::middleware::{Middleware, Next};
/// use barricade::{BoxFuture, Request};
///
/// struct PoweredBy;
///
/// impl Middleware for PoweredBy {
///     fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
///         Box::pin(async move {
///             let mut res = next.run(req).await;
///             res.set_header("x-powered-by", "barricade");
///             res
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a>;
}

/// Shared, ordered middleware stack.
pub(crate) type Chain = Arc<[Arc<dyn Middleware>]>;

/// The remainder of the pipeline after the current middleware.
pub struct Next {
    chain: Chain,
    index: usize,
    handler: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Chain, handler: BoxedHandler) -> Self {
        Self { chain, index: 0, handler }
    }

    /// Runs the next middleware, or the route handler once the chain is spent.
    pub fn run(self, req: Request) -> BoxFuture<'static> {
        match self.chain.get(self.index).cloned() {
            Some(layer) => {
                let next = Self { chain: self.chain, index: self.index + 1, handler: self.handler };
                Box::pin(async move { layer.handle(req, next).await })
            }
            None => self.handler.call(req),
        }
    }
}
