//! Per-request tracing middleware.
//!
//! Opens a span named by the matched route pattern (so `/tasks/42` and
//! `/tasks/43` aggregate under `GET /tasks/{id}`), and logs one completion
//! line with status and latency. With no subscriber installed everything here
//! is a no-op — the middleware never fails a request.
//!
//! Register first: the span should cover recovery, authentication, and the
//! handler alike.

use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::AppError;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::router::RoutePattern;

pub struct Trace;

#[async_trait]
impl Middleware for Trace {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, AppError> {
        let method = req.method().to_owned();
        // The router injects the pattern before the chain runs; "unrouted"
        // only shows up if someone drives this middleware by hand.
        let pattern = RoutePattern::from_request(&req)
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|_| "unrouted".to_owned());

        let span = tracing::info_span!("request", %method, pattern = %pattern);
        let start = Instant::now();
        let outcome = next.run(req).instrument(span).await;

        let status = match &outcome {
            Ok(resp) => resp.status_code(),
            Err(err) => err.status(),
        };
        tracing::info!(
            %method,
            pattern = %pattern,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request completed"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use std::sync::Arc;

    async fn fails(_req: Request) -> Result<Response, AppError> {
        Err(AppError::conflict("already done"))
    }

    #[tokio::test]
    async fn outcome_passes_through_untouched() {
        let endpoint = fails.into_boxed_handler();
        let chain: Vec<Arc<dyn Middleware>> = Vec::new();

        let mut req = Request::builder().method("PUT").uri("/tasks/1").build();
        req.extensions_mut().insert(RoutePattern::new("PUT /tasks/{id}"));

        let err = Trace
            .handle(req, Next { chain: &chain, endpoint: &endpoint })
            .await
            .unwrap_err();
        assert_eq!(err.status(), 409);
        assert_eq!(err.client_message(), "already done");
    }
}
