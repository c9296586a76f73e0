//! Pattern-aware request router.
//!
//! One radix tree per HTTP method (`matchit`) — O(path-length) lookup, no
//! locks: the table is built once at startup and only read while serving.
//!
//! Beyond dispatch, the router is the seam the rest of the crate hangs off:
//!
//! - it injects the matched [`RoutePattern`] into the request context before
//!   anything else runs, so middleware can name the operation consistently
//!   (`GET /tasks/{id}`, not `/tasks/42`);
//! - unmatched requests go to configurable fallback handlers — "no route"
//!   and "route exists, method differs" are distinguished, with the
//!   sentinel patterns [`RoutePattern::NOT_FOUND`] and
//!   [`RoutePattern::METHOD_NOT_ALLOWED`] injected so the fallbacks flow
//!   through the same middleware chain as real routes;
//! - it is the **terminal error boundary**: an `Err(AppError)` coming back
//!   out of the chain is logged exactly once at its severity and rendered
//!   as a problem-detail body. No other layer translates errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::AppError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Middleware, Next};
use crate::problem;
use crate::request::{Request, RequestId};
use crate::response::Response;
use crate::status::Status;

// ── RoutePattern ──────────────────────────────────────────────────────────────

/// The method + path template a request matched, e.g. `"GET /tasks/{id}"`.
///
/// Injected into the request context by the router; read by middleware for
/// span naming, auth skip-lists, and per-route authorization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoutePattern(Arc<str>);

impl RoutePattern {
    /// Sentinel pattern injected for requests no route matched.
    pub const NOT_FOUND: &'static str = "NotFound";

    /// Sentinel pattern injected when the path exists under another method,
    /// or the method string is unknown.
    pub const METHOD_NOT_ALLOWED: &'static str = "MethodNotAllowed";

    pub(crate) fn new(pattern: impl Into<Arc<str>>) -> Self {
        Self(pattern.into())
    }

    /// The pattern the router injected for this request.
    ///
    /// Absence is a wiring bug — a handler or middleware invoked outside the
    /// router — and surfaces as an internal `500`-class error, never as a
    /// client error.
    pub fn from_request(req: &Request) -> Result<Self, AppError> {
        req.extensions().get::<RoutePattern>().cloned().ok_or_else(|| {
            AppError::internal(
                "route pattern missing from request context; handler invoked outside the router",
            )
        })
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

struct Route {
    pattern: Arc<str>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration method returns `self` so calls chain naturally.
///
/// ```rust
/// use taskd::{AppError, Method, Request, Response, Router};
///
/// # async fn get_task(_: Request) -> Result<Response, AppError> { Ok(Response::text("")) }
/// # async fn create_task(_: Request) -> Result<Response, AppError> { Ok(Response::text("")) }
/// let app = Router::new()
///     .on(Method::Get,  "/tasks/{id}", get_task)
///     .on(Method::Post, "/tasks",      create_task);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    not_found: BoxedHandler,
    method_not_allowed: BoxedHandler,
}

async fn default_not_found(_req: Request) -> Result<Response, AppError> {
    Ok(Response::status(Status::NotFound))
}

async fn default_method_not_allowed(_req: Request) -> Result<Response, AppError> {
    Ok(Response::status(Status::MethodNotAllowed))
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middlewares: Vec::new(),
            not_found: default_not_found.into_boxed_handler(),
            method_not_allowed: default_method_not_allowed.into_boxed_handler(),
        }
    }

    /// Registers a handler for a method + path pair. Returns `self` for
    /// chaining. The registered pattern — what [`RoutePattern::from_request`]
    /// reports downstream — is `"METHOD /path"`.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves
    /// them.
    ///
    /// # Panics
    ///
    /// Panics on an invalid path template or a duplicate registration.
    /// Routes are wired at startup: a bad registration is a configuration
    /// error, not a runtime condition.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler.into_boxed_handler())
    }

    /// Appends a middleware. The first-registered middleware is outermost:
    /// it runs first on the way in and last on the way out.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Replaces the fallback for requests no route matches.
    /// Default: empty `404`.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = handler.into_boxed_handler();
        self
    }

    /// Replaces the fallback for requests whose path exists under a
    /// different method. Default: empty `405`.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = handler.into_boxed_handler();
        self
    }

    fn add(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        let pattern: Arc<str> = format!("{method} {path}").into();
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Route { pattern, handler })
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    /// Routes one request through the middleware chain to its handler and
    /// renders the outcome. This is the whole per-request pipeline; the
    /// server's only job is framing.
    pub async fn serve(&self, mut req: Request) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        req.extensions_mut().insert(RequestId(request_id.clone()));

        let mut resp = self.dispatch(req, &request_id).await;
        resp.push_header("x-request-id", &request_id);
        resp
    }

    async fn dispatch(&self, mut req: Request, request_id: &str) -> Response {
        // Asterisk-form request target (`OPTIONS *`, CONNECT proxies).
        // Standard proxies send it; this server has no use for it.
        if req.path() == "*" {
            return Response::status(Status::BadRequest);
        }

        let path = req.path().to_owned();
        let method = req.method().parse::<Method>().ok();

        let (handler, pattern, params) = match method.and_then(|m| self.lookup(m, &path)) {
            Some(found) => found,
            None => {
                // Unknown method strings and method mismatches both land on
                // the Method-Not-Allowed fallback; only a path that exists
                // under no method at all is Not-Found.
                if method.is_none() || self.matches_under_other_method(method, &path) {
                    (
                        Arc::clone(&self.method_not_allowed),
                        Arc::from(RoutePattern::METHOD_NOT_ALLOWED),
                        HashMap::new(),
                    )
                } else {
                    (
                        Arc::clone(&self.not_found),
                        Arc::from(RoutePattern::NOT_FOUND),
                        HashMap::new(),
                    )
                }
            }
        };

        req.extensions_mut().insert(RoutePattern::new(pattern));
        req.set_params(params);

        let next = Next { chain: &self.middlewares, endpoint: &handler };
        match next.run(req).await {
            Ok(resp) => resp,
            Err(err) => {
                // Terminal boundary: the one error → log and error → body
                // translation in the crate.
                err.log(&path);
                problem::render(&err, &path, Some(request_id))
            }
        }
    }

    fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, Arc<str>, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((
            Arc::clone(&matched.value.handler),
            Arc::clone(&matched.value.pattern),
            params,
        ))
    }

    fn matches_under_other_method(&self, method: Option<Method>, path: &str) -> bool {
        self.routes
            .iter()
            .any(|(m, tree)| Some(*m) != method && tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemDetail;

    async fn echo_pattern(req: Request) -> Result<Response, AppError> {
        let pattern = RoutePattern::from_request(&req)?;
        Ok(Response::text(pattern.as_str()))
    }

    async fn echo_param(req: Request) -> Result<Response, AppError> {
        Ok(Response::text(req.param("id").unwrap_or("missing")))
    }

    async fn fails(_req: Request) -> Result<Response, AppError> {
        Err(AppError::conflict("task already exists"))
    }

    async fn get(router: &Router, uri: &str) -> Response {
        router.serve(Request::builder().method("GET").uri(uri).build()).await
    }

    #[tokio::test]
    async fn handler_observes_the_exact_registration_pattern() {
        let router = Router::new().on(Method::Get, "/tasks/{id}", echo_pattern);
        let resp = get(&router, "/tasks/42").await;
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.body(), b"GET /tasks/{id}");
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let router = Router::new().on(Method::Get, "/tasks/{id}", echo_param);
        let resp = get(&router, "/tasks/42").await;
        assert_eq!(resp.body(), b"42");
    }

    #[tokio::test]
    async fn unmatched_route_uses_the_not_found_fallback_with_sentinel_pattern() {
        let router = Router::new()
            .on(Method::Get, "/tasks", echo_pattern)
            .not_found(echo_pattern);
        let resp = get(&router, "/nope").await;
        assert_eq!(resp.body(), RoutePattern::NOT_FOUND.as_bytes());
    }

    #[tokio::test]
    async fn default_not_found_is_an_empty_404() {
        let router = Router::new().on(Method::Get, "/tasks", echo_pattern);
        let resp = get(&router, "/nope").await;
        assert_eq!(resp.status_code(), 404);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn wrong_method_is_distinguished_from_no_route() {
        let router = Router::new()
            .on(Method::Get, "/tasks", echo_pattern)
            .method_not_allowed(echo_pattern);

        let resp = router
            .serve(Request::builder().method("POST").uri("/tasks").build())
            .await;
        assert_eq!(resp.body(), RoutePattern::METHOD_NOT_ALLOWED.as_bytes());

        let resp = get(&router, "/absent").await;
        assert_eq!(resp.status_code(), 404);
    }

    #[tokio::test]
    async fn default_method_not_allowed_is_an_empty_405() {
        let router = Router::new().on(Method::Get, "/tasks", echo_pattern);
        let resp = router
            .serve(Request::builder().method("DELETE").uri("/tasks").build())
            .await;
        assert_eq!(resp.status_code(), 405);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn unknown_method_string_is_rejected_with_405() {
        let router = Router::new().on(Method::Get, "/tasks", echo_pattern);
        let resp = router
            .serve(Request::builder().method("BREW").uri("/tasks").build())
            .await;
        assert_eq!(resp.status_code(), 405);
    }

    #[tokio::test]
    async fn asterisk_request_target_is_a_400() {
        let router = Router::new().on(Method::Get, "/tasks", echo_pattern);
        let resp = router
            .serve(Request::builder().method("OPTIONS").uri("*").build())
            .await;
        assert_eq!(resp.status_code(), 400);
    }

    #[tokio::test]
    async fn handler_errors_render_as_problem_detail_with_matching_status() {
        let router = Router::new().on(Method::Get, "/tasks", fails);
        let resp = get(&router, "/tasks").await;

        assert_eq!(resp.status_code(), 409);
        let body: ProblemDetail = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.status, 409);
        assert_eq!(body.detail, "task already exists");
        assert_eq!(body.instance, "/tasks");
        assert_eq!(body.request_id.as_deref(), resp.header("x-request-id"));
    }

    #[tokio::test]
    async fn every_response_carries_a_request_id() {
        let router = Router::new().on(Method::Get, "/tasks", echo_pattern);
        let resp = get(&router, "/tasks").await;
        assert!(resp.header("x-request-id").is_some_and(|id| !id.is_empty()));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn duplicate_registration_panics_at_startup() {
        let _ = Router::new()
            .on(Method::Get, "/tasks", echo_pattern)
            .on(Method::Get, "/tasks", echo_pattern);
    }
}
