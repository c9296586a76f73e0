//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router (and in the auth skip-set — probes carry no
//! credentials):
//!
//! ```rust,no_run
//! use taskd::{Method, Router, health};
//!
//! let app = Router::new()
//!     .on(Method::Get, "/healthz", health::liveness)
//!     .on(Method::Get, "/readyz", health::readiness);
//! ```
//!
//! Override `readiness` with a custom handler to gate on dependency
//! availability (database connections, downstream services, etc.).

use crate::error::AppError;
use crate::{Request, Response};

/// Kubernetes liveness probe handler.
///
/// Always returns `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness(_req: Request) -> Result<Response, AppError> {
    Ok(Response::text("ok"))
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Returns `200 OK` with body `"ready"`. Replace with your own handler if the
/// application needs a warm-up period before accepting traffic.
pub async fn readiness(_req: Request) -> Result<Response, AppError> {
    Ok(Response::text("ready"))
}
