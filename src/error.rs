//! Structured application error.
//!
//! [`AppError`] is the one error type that crosses layer boundaries. It is
//! constructed where a failure is detected — entity validation, a store
//! lookup, an authentication check — and propagated up unchanged with `?`.
//! The router's terminal boundary is the only place that turns it into an
//! HTTP response and a log entry; nothing in between re-wraps it in a way
//! that loses the original status or severity.
//!
//! Infrastructure failures (binding a port, accepting a connection) are not
//! `AppError`s — those live in [`ServeError`](crate::server::ServeError).

use std::error::Error as StdError;
use std::fmt;

use crate::status::Status;

/// A boxed cause attached to an [`AppError`].
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

// ── Severity ──────────────────────────────────────────────────────────────────

/// Log severity of an error, independent of its HTTP status.
///
/// Maps one-to-one onto `tracing` levels at the terminal boundary.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Default severity for an HTTP status: client errors are `Warn`,
    /// everything else is `Error`.
    fn for_status(status: u16) -> Self {
        if (400..500).contains(&status) { Self::Warn } else { Self::Error }
    }
}

// ── AppError ──────────────────────────────────────────────────────────────────

/// The structured error carried through handlers, stores, and middleware.
///
/// Fields are fixed at construction: the builder methods consume `self` and
/// belong at the construction site only. Accessors never mutate.
///
/// ```rust
/// use taskd::{AppError, Severity};
///
/// let err = AppError::not_found("task 42 does not exist");
/// assert_eq!(err.status(), 404);
/// assert_eq!(err.severity(), Severity::Warn);
/// ```
#[derive(Debug)]
pub struct AppError {
    internal: String,
    client: String,
    status: u16,
    severity: Severity,
    cause: Option<Cause>,
}

impl AppError {
    /// An error with an internal diagnostic message and a client-facing
    /// message. Defaults to `500` / [`Severity::Error`]; adjust with
    /// [`with_status`](Self::with_status) and friends.
    pub fn new(internal: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            internal: internal.into(),
            client: client.into(),
            status: 500,
            severity: Severity::Error,
            cause: None,
        }
    }

    // Semantic constructors, one per taxonomy entry. The message doubles as
    // internal and client text; use `new` when they must differ.

    /// `400 Bad Request` / `Warn` — input failed validation.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::same_message(msg, Status::BadRequest)
    }

    /// `401 Unauthorized` / `Warn` — no usable credential.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::same_message(msg, Status::Unauthorized)
    }

    /// `403 Forbidden` / `Warn` — authenticated but not permitted.
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::same_message(msg, Status::Forbidden)
    }

    /// `404 Not Found` / `Warn`.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::same_message(msg, Status::NotFound)
    }

    /// `409 Conflict` / `Warn` — the entity already exists or was modified.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::same_message(msg, Status::Conflict)
    }

    /// `500 Internal Server Error` / `Error` with a generic client message.
    /// The internal message is logged, never sent to the caller.
    pub fn internal(internal: impl Into<String>) -> Self {
        Self::new(internal, "internal server error")
    }

    /// Wraps a foreign error nobody classified: `500` / `Error`, generic
    /// client message, the original error preserved as the cause.
    pub fn unexpected(cause: impl Into<Cause>) -> Self {
        let cause = cause.into();
        Self::internal(format!("unexpected error: {cause}")).with_cause(cause)
    }

    fn same_message(msg: impl Into<String>, status: Status) -> Self {
        let msg = msg.into();
        Self::new(msg.clone(), msg).with_status(status)
    }

    /// Overrides the HTTP status. Re-derives the default severity for the new
    /// status, so call [`with_severity`](Self::with_severity) after this one
    /// to pin an explicit severity.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status.into();
        self.severity = Severity::for_status(self.status);
        self
    }

    /// Overrides the log severity independently of the status.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attaches the underlying error. Available afterwards via
    /// [`source`](StdError::source) for `downcast_ref` inspection.
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// HTTP status code rendered to the client.
    pub fn status(&self) -> u16 { self.status }

    /// Severity the terminal boundary logs this error at.
    pub fn severity(&self) -> Severity { self.severity }

    /// Message safe to show the caller.
    pub fn client_message(&self) -> &str { &self.client }

    /// Diagnostic message, excluding the cause chain.
    pub fn internal_message(&self) -> &str { &self.internal }

    /// Emits the single log entry for this error at its severity.
    ///
    /// Called once per failed request, by the terminal boundary in
    /// [`Router::serve`](crate::Router::serve).
    pub(crate) fn log(&self, path: &str) {
        match self.severity {
            Severity::Info => tracing::info!(status = self.status, %path, "{self}"),
            Severity::Warn => tracing::warn!(status = self.status, %path, "{self}"),
            Severity::Error => tracing::error!(status = self.status, %path, "{self}"),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.internal),
            None => f.write_str(&self.internal),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}
