//! # taskd
//!
//! A small tasks REST API on a minimal hyper routing core.
//!
//! The interesting part is not the CRUD — it is the request pipeline every
//! endpoint shares:
//!
//! - [`Router`] — radix-tree dispatch (`matchit`) that injects the matched
//!   [`RoutePattern`] into the request context and falls back to
//!   configurable Not-Found / Method-Not-Allowed handlers.
//! - [`middleware`] — an ordered chain: [`Trace`](middleware::Trace) spans,
//!   [`Recover`](middleware::Recover) panic containment,
//!   [`RequireAuth`](middleware::RequireAuth) /
//!   [`RequireRole`](middleware::RequireRole) identity and role checks.
//! - [`AppError`] — one structured error for every layer: client message,
//!   HTTP status, log severity, cause chain. The router renders it as an
//!   RFC 7807 [`ProblemDetail`] body and logs it exactly once.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use taskd::{AppError, Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::Get,  "/tasks/{id}", get_task)
//!         .on(Method::Post, "/tasks",      create_task);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_task(req: Request) -> Result<Response, AppError> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes()))
//! }
//!
//! async fn create_task(req: Request) -> Result<Response, AppError> {
//!     if req.body().is_empty() {
//!         return Err(AppError::validation("request body must not be empty"));
//!     }
//!     Ok(Response::builder()
//!         .status(taskd::Status::Created)
//!         .header("location", "/tasks/99")
//!         .json(br#"{"id":"99"}"#.to_vec()))
//! }
//! ```
//!
//! The full service — stores, config, auth stack — is assembled in
//! [`api::app`] and started by the `taskd` binary.

mod error;
mod handler;
mod method;
mod problem;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod api;
pub mod config;
pub mod domain;
pub mod health;
pub mod middleware;
pub mod store;

pub use config::Config;
pub use error::{AppError, Cause, Severity};
pub use handler::Handler;
pub use method::Method;
pub use problem::ProblemDetail;
pub use request::{Request, RequestBuilder, RequestId};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{RoutePattern, Router};
pub use server::{ServeError, Server};
pub use status::Status;
