//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the place for
//! cross-cutting concerns: structured tracing, panic recovery, and
//! authentication-header inspection.
//!
//! A middleware receives the [`Request`] and a [`Next`] handle to the rest of
//! the chain. It may short-circuit by returning early (auth failures do), or
//! call `next.run(req)` and post-process the outcome.
//!
//! # Ordering
//!
//! Middleware is registered with [`Router::layer`](crate::Router::layer);
//! the first-registered middleware is the outermost — it runs first on the
//! way in and last on the way out. The stack this crate ships expects:
//!
//! ```text
//! trace → recover → authenticate → authorize → handler
//! ```
//!
//! Trace wraps everything so the span covers auth failures; recover wraps
//! auth so a panic inside an [`Authenticator`] is still caught.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

mod auth;
mod recover;
mod trace;

pub use auth::{Authenticator, Principal, PresharedKeys, RequireAuth, RequireRole, Role};
pub use recover::{AbortHandler, Recover};
pub use trace::Trace;

/// A step in the request-processing chain.
///
/// Implementations hold only read-only or internally-synchronized state —
/// one instance serves every concurrent request.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, AppError>;
}

/// The remainder of the chain, ending at the resolved route handler.
///
/// Consumed by `run`: a middleware cannot invoke the rest of the chain
/// twice, which keeps "the handler ran at most once" a type-level fact.
pub struct Next<'a> {
    pub(crate) chain: &'a [Arc<dyn Middleware>],
    pub(crate) endpoint: &'a BoxedHandler,
}

impl Next<'_> {
    /// Runs the remaining middleware, then the handler.
    pub async fn run(self, req: Request) -> Result<Response, AppError> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.handle(req, Next { chain: rest, endpoint: self.endpoint }).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;

    /// Appends its tag on the way in, so tests can observe execution order.
    struct Tag(&'static str, std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, AppError> {
            self.1.lock().unwrap().push(self.0);
            next.run(req).await
        }
    }

    async fn endpoint(_req: Request) -> Result<&'static str, AppError> {
        Ok("done")
    }

    #[tokio::test]
    async fn chain_runs_in_registration_order() {
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Tag("outer", Arc::clone(&order))),
            Arc::new(Tag("inner", Arc::clone(&order))),
        ];
        let handler = endpoint.into_boxed_handler();

        let next = Next { chain: &chain, endpoint: &handler };
        let resp = next.run(Request::builder().build()).await.unwrap();

        assert_eq!(resp.body(), b"done");
        assert_eq!(*order.lock().unwrap(), vec!["outer", "inner"]);
    }
}
