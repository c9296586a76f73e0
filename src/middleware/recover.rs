//! Panic recovery middleware.
//!
//! A panicking handler must not take the serving process down or leave the
//! connection half-written. [`Recover`] catches the unwind, logs it once at
//! error severity, and answers with a generic `500` problem body — the panic
//! payload itself never reaches the client.
//!
//! The one exception is [`AbortHandler`]: a handler that has hijacked its
//! connection (streaming, upgrade) signals "do not write a response" by
//! panicking with this sentinel, and `Recover` re-raises it unmodified.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::error::AppError;
use crate::middleware::{Middleware, Next};
use crate::problem::ProblemDetail;
use crate::request::{Request, RequestId};
use crate::response::Response;
use crate::status::Status;

/// Panic sentinel for hijacked connections.
///
/// Raise with `std::panic::panic_any(AbortHandler)` from a handler whose
/// connection must not be written to any more. [`Recover`] propagates the
/// panic instead of producing a `500` body.
pub struct AbortHandler;

/// Catches panics from everything it wraps.
///
/// Register this before (outside of) authentication so a panic inside an
/// [`Authenticator`](crate::middleware::Authenticator) is caught too.
pub struct Recover;

#[async_trait]
impl Middleware for Recover {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, AppError> {
        // Captured up front: the request is consumed by the chain and is
        // gone by the time a panic surfaces.
        let path = req.path().to_owned();
        let request_id = RequestId::from_request(&req).map(|id| id.as_str().to_owned());
        let upgrading = req.header("upgrade").is_some();

        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                if payload.is::<AbortHandler>() {
                    // Hijacked connection: writing a body here would corrupt
                    // the stream. Let the panic keep travelling.
                    std::panic::resume_unwind(payload);
                }

                // The single log entry for this panic. Returning Ok below
                // keeps the terminal boundary from logging a second one.
                tracing::error!(%path, panic = panic_message(payload.as_ref()), "handler panicked");

                if upgrading {
                    return Ok(Response::status(Status::InternalServerError));
                }

                let mut problem =
                    ProblemDetail::new(500, "internal server error", path.as_str());
                if let Some(id) = request_id {
                    problem = problem.with_request_id(id);
                }
                Ok(problem.into_response())
            }
        }
    }
}

/// Best-effort text of a panic payload. `panic!` produces `&str` or `String`;
/// anything else (a `panic_any` value) has no useful display form.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use std::sync::Arc;

    async fn panics(_req: Request) -> Result<Response, AppError> {
        panic!("boom")
    }

    async fn aborts(_req: Request) -> Result<Response, AppError> {
        std::panic::panic_any(AbortHandler)
    }

    #[tokio::test]
    async fn panic_becomes_a_generic_500_problem() {
        let endpoint = panics.into_boxed_handler();
        let chain: Vec<Arc<dyn crate::middleware::Middleware>> = Vec::new();

        let req = Request::builder().uri("/tasks/9").build();
        let resp = Recover
            .handle(req, Next { chain: &chain, endpoint: &endpoint })
            .await
            .unwrap();

        assert_eq!(resp.status_code(), 500);
        let body: ProblemDetail = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.detail, "internal server error");
        assert_eq!(body.instance, "/tasks/9");
        assert!(!std::str::from_utf8(resp.body()).unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn upgraded_connection_gets_a_bare_500() {
        let endpoint = panics.into_boxed_handler();
        let chain: Vec<Arc<dyn crate::middleware::Middleware>> = Vec::new();

        let req = Request::builder()
            .uri("/ws")
            .header("upgrade", "websocket")
            .build();
        let resp = Recover
            .handle(req, Next { chain: &chain, endpoint: &endpoint })
            .await
            .unwrap();

        assert_eq!(resp.status_code(), 500);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn abort_sentinel_propagates_out_of_the_middleware() {
        let result = tokio::spawn(async {
            let endpoint = aborts.into_boxed_handler();
            let chain: Vec<Arc<dyn crate::middleware::Middleware>> = Vec::new();
            let req = Request::builder().uri("/stream").build();
            Recover
                .handle(req, Next { chain: &chain, endpoint: &endpoint })
                .await
        })
        .await;

        let join_err = result.expect_err("the abort panic must escape Recover");
        assert!(join_err.is_panic());
        assert!(join_err.into_panic().is::<AbortHandler>());
    }
}
