//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`. Rust collections can only hold one concrete type,
//! so we use **trait objects** (`dyn ErasedHandler`) to hide the concrete
//! handler type behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn get_task(req: Request) -> Result<Response, AppError> { … }
//!        ↓ router.on(Method::Get, "/tasks/{id}", get_task)
//! get_task.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_task))                    ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//! ```
//!
//! The only runtime cost per request is **one Arc clone** (atomic inc) +
//! **one virtual call** — negligible compared to network I/O.
//!
//! Every handler is fallible: it resolves to `Result<Response, AppError>`.
//! The `Err` arm is the propagation vehicle of the error model — the router's
//! terminal boundary renders it; handlers just `?` their way up.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AppError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to a handler outcome.
///
/// `Pin<Box<…>>` because the runtime polls the future in place; `Send +
/// 'static` so tokio may move it across threads.
pub(crate) type BoxFuture =
    Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or capturing closure) with the signature:
///
/// ```text
/// async fn name(req: Request) -> Result<impl IntoResponse, AppError>
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

/// `Fn(Request) -> Fut` covers named `async fn` items, closures capturing
/// shared state behind an `Arc`, and any struct implementing `Fn`.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // The success value is mapped through `IntoResponse`; the error
        // passes through untouched so the terminal boundary sees the
        // original status and severity.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    async fn ok_text(_req: Request) -> Result<&'static str, AppError> {
        Ok("fine")
    }

    async fn fails(_req: Request) -> Result<Response, AppError> {
        Err(AppError::not_found("nothing here"))
    }

    #[tokio::test]
    async fn erased_handler_maps_success_through_into_response() {
        let handler = ok_text.into_boxed_handler();
        let resp = handler.call(Request::builder().build()).await.unwrap();
        assert_eq!(resp.status_code(), u16::from(Status::Ok));
        assert_eq!(resp.body(), b"fine");
    }

    #[tokio::test]
    async fn erased_handler_passes_errors_through_unchanged() {
        let handler = fails.into_boxed_handler();
        let err = handler.call(Request::builder().build()).await.unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.client_message(), "nothing here");
    }
}
