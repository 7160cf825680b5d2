use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Opens one span per request and records status and latency on completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        Box::pin(
            async move {
                let started = Instant::now();
                let res = next.run(req).await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_us = started.elapsed().as_micros() as u64,
                    "request completed"
                );
                res
            }
            .instrument(span),
        )
    }
}
