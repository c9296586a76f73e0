//! Authentication and authorization middleware.
//!
//! [`RequireAuth`] resolves the caller's identity before the handler runs:
//! it pulls the bearer credential from the `Authorization` header, hands it
//! to the configured [`Authenticator`], and attaches the resulting
//! [`Principal`] to the request. A failed authentication is terminal — `401`,
//! stable message, the wrapped handler is never invoked.
//!
//! [`RequireRole`] is the separate authorization step: a per-route-pattern
//! allow-set of roles, checked against the principal already attached by
//! `RequireAuth`. Routes without an entry pass through.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;
use crate::method::Method;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::router::RoutePattern;
use crate::status::Status;

/// Stable client-facing detail for every authentication failure. One
/// message for "no header", "bad scheme", and "unknown credential" alike —
/// the distinction is for the log, not the caller.
const NO_AUTHENTICATED_USER: &str = "no authenticated user";

/// Stable client-facing detail for authorization failures.
const ROLE_NOT_PERMITTED: &str = "role not permitted";

// ── Principal ─────────────────────────────────────────────────────────────────

/// Caller role. A closed set; `Undefined` exists so a principal can be
/// represented before its role assignment is known.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Undefined,
}

/// The authenticated identity of a request. Lives in the request context for
/// exactly one request; never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    subject: String,
    role: Role,
}

impl Principal {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self { subject: subject.into(), role }
    }

    /// The principal attached by [`RequireAuth`], if authentication ran.
    pub fn from_request(req: &Request) -> Option<&Principal> {
        req.extensions().get::<Principal>()
    }

    pub fn subject(&self) -> &str { &self.subject }

    pub fn role(&self) -> Role { self.role }
}

// ── Authenticator ─────────────────────────────────────────────────────────────

/// The credential-verification capability.
///
/// Takes a bearer credential string, returns a [`Principal`] or fails. A
/// pre-shared-key table ships in-crate; JWT/JWKS validators plug in through
/// the same seam.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Principal, AppError>;
}

/// Token → principal lookup backed by a table from configuration.
#[derive(Default)]
pub struct PresharedKeys {
    tokens: HashMap<String, Principal>,
}

impl PresharedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as the credential of `principal`. Last insert wins.
    pub fn insert(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

#[async_trait]
impl Authenticator for PresharedKeys {
    async fn authenticate(&self, credential: &str) -> Result<Principal, AppError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| AppError::authentication("credential not in pre-shared key table"))
    }
}

// ── RequireAuth ───────────────────────────────────────────────────────────────

/// Authentication middleware.
///
/// The skip-set is explicit configuration, never inferred: CORS preflight
/// (`OPTIONS`) and the health probes are the usual entries.
///
/// ```rust
/// use std::sync::Arc;
/// use taskd::middleware::{PresharedKeys, Principal, RequireAuth, Role};
/// use taskd::Method;
///
/// let keys = PresharedKeys::new()
///     .insert("valid-token", Principal::new("tecchu", Role::Admin));
/// let auth = RequireAuth::new(Arc::new(keys))
///     .skip_method(Method::Options)
///     .skip("GET /healthz");
/// ```
pub struct RequireAuth {
    authenticator: Arc<dyn Authenticator>,
    skip_methods: HashSet<Method>,
    skip_patterns: HashSet<String>,
}

impl RequireAuth {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            skip_methods: HashSet::new(),
            skip_patterns: HashSet::new(),
        }
    }

    /// Bypasses authentication for every request with this method.
    pub fn skip_method(mut self, method: Method) -> Self {
        self.skip_methods.insert(method);
        self
    }

    /// Bypasses authentication for one registered route pattern,
    /// e.g. `"GET /healthz"`.
    pub fn skip(mut self, pattern: &str) -> Self {
        self.skip_patterns.insert(pattern.to_owned());
        self
    }

    fn skipped(&self, req: &Request) -> Result<bool, AppError> {
        if let Ok(method) = req.method().parse::<Method>() {
            if self.skip_methods.contains(&method) {
                return Ok(true);
            }
        }
        if self.skip_patterns.is_empty() {
            return Ok(false);
        }
        let pattern = RoutePattern::from_request(req)?;
        Ok(self.skip_patterns.contains(pattern.as_str()))
    }
}

#[async_trait]
impl Middleware for RequireAuth {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Result<Response, AppError> {
        if self.skipped(&req)? {
            return next.run(req).await;
        }

        let credential = bearer_credential(&req)?;
        let principal = self
            .authenticator
            .authenticate(&credential)
            .await
            .map_err(|e| {
                AppError::new(format!("authentication failed: {e}"), NO_AUTHENTICATED_USER)
                    .with_status(Status::Unauthorized)
                    .with_cause(e)
            })?;

        tracing::debug!(subject = principal.subject(), "request authenticated");
        req.extensions_mut().insert(principal);
        next.run(req).await
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`. Scheme matching is
/// case-insensitive per RFC 6750; the token is returned verbatim.
fn bearer_credential(req: &Request) -> Result<String, AppError> {
    let header = req.header("authorization").ok_or_else(|| {
        AppError::new("missing authorization header", NO_AUTHENTICATED_USER)
            .with_status(Status::Unauthorized)
    })?;

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token.to_owned())
        }
        _ => Err(
            AppError::new("authorization header is not a bearer credential", NO_AUTHENTICATED_USER)
                .with_status(Status::Unauthorized),
        ),
    }
}

// ── RequireRole ───────────────────────────────────────────────────────────────

/// Authorization middleware: per-route allow-sets of roles.
///
/// Register inside (after) [`RequireAuth`] — it reads the principal that
/// `RequireAuth` attached.
#[derive(Default)]
pub struct RequireRole {
    allowed: HashMap<String, Vec<Role>>,
}

impl RequireRole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `pattern` to the given roles. Patterns without an entry are
    /// not restricted beyond authentication.
    pub fn allow(mut self, pattern: &str, roles: impl Into<Vec<Role>>) -> Self {
        self.allowed.insert(pattern.to_owned(), roles.into());
        self
    }
}

#[async_trait]
impl Middleware for RequireRole {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, AppError> {
        let pattern = RoutePattern::from_request(&req)?;
        let Some(allowed) = self.allowed.get(pattern.as_str()) else {
            return next.run(req).await;
        };

        let Some(principal) = Principal::from_request(&req) else {
            return Err(
                AppError::new("no principal in request context", NO_AUTHENTICATED_USER)
                    .with_status(Status::Unauthorized),
            );
        };

        if !allowed.contains(&principal.role()) {
            return Err(AppError::new(
                format!(
                    "role {:?} of {} not in allow-set of {}",
                    principal.role(),
                    principal.subject(),
                    pattern.as_str(),
                ),
                ROLE_NOT_PERMITTED,
            )
            .with_status(Status::Forbidden));
        }

        next.run(req).await
    }
}
