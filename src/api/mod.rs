//! Route table and middleware stack assembly.
//!
//! [`app`] wires the whole service: health probes, user registration, task
//! CRUD, and the middleware stack in its contractual order —
//! trace → recover → authenticate → authorize → handler.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::handler::Handler;
use crate::health;
use crate::method::Method;
use crate::middleware::{Authenticator, Recover, RequireAuth, RequireRole, Role, Trace};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::store::{TaskStore, UserStore};

mod tasks;
mod users;

pub use tasks::TaskApi;
pub use users::UserApi;

/// Everything the route table depends on, constructed once in `main` and
/// passed down explicitly.
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Builds the full application router.
///
/// Authentication is skipped for CORS preflight, the health probes, and
/// registration (a caller registering has no credential yet). Task deletion
/// is restricted to `Admin`.
pub fn app(state: AppState) -> Router {
    let tasks = Arc::new(TaskApi::new(state.tasks));
    let users = Arc::new(UserApi::new(state.users));

    let auth = RequireAuth::new(state.authenticator)
        .skip_method(Method::Options)
        .skip("GET /healthz")
        .skip("GET /readyz")
        .skip("POST /users");

    let authz = RequireRole::new().allow("DELETE /tasks/{id}", vec![Role::Admin]);

    Router::new()
        .layer(Trace)
        .layer(Recover)
        .layer(auth)
        .layer(authz)
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", health::readiness)
        .on(Method::Post, "/users", route(&users, |api, req| async move {
            api.register(req).await
        }))
        .on(Method::Post, "/tasks", route(&tasks, |api, req| async move {
            api.create(req).await
        }))
        .on(Method::Get, "/tasks", route(&tasks, |api, req| async move {
            api.list(req).await
        }))
        .on(Method::Get, "/tasks/{id}", route(&tasks, |api, req| async move {
            api.get(req).await
        }))
        .on(Method::Put, "/tasks/{id}", route(&tasks, |api, req| async move {
            api.update(req).await
        }))
        .on(Method::Delete, "/tasks/{id}", route(&tasks, |api, req| async move {
            api.delete(req).await
        }))
}

/// Adapts an API method into a route handler: clones the shared API handle
/// per request and forwards the request to `f`.
fn route<A, F, Fut>(api: &Arc<A>, f: F) -> impl Handler
where
    A: Send + Sync + 'static,
    F: Fn(Arc<A>, Request) -> Fut + Copy + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    let api = Arc::clone(api);
    move |req: Request| f(Arc::clone(&api), req)
}

/// Serializes a response body, folding the (practically unreachable)
/// serialization failure into the error model.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(value).map_err(|e| AppError::unexpected(e))
}
