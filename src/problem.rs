//! RFC 7807 problem-detail rendering.
//!
//! Every failed request answers with the same JSON shape, no matter which
//! layer failed:
//!
//! ```json
//! {"type":"about:blank","title":"Not Found","detail":"task 42 does not exist",
//!  "instance":"/tasks/42","status":404,"request_id":"…"}
//! ```
//!
//! Only the client message of an [`AppError`] reaches the body. Internal
//! messages and cause chains are logged server-side at the error's severity
//! and never serialized.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::response::{ContentType, Response};
use crate::status::reason_phrase;

/// The problem-detail body. `Deserialize` is derived so tests and clients
/// can parse responses back; the server only ever serializes it.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub detail: String,
    pub instance: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ProblemDetail {
    /// A problem body for `status` at `instance`, with `detail` shown to the
    /// caller. `type` is always `about:blank`: the status code itself is the
    /// semantics (RFC 7807 §4.2).
    pub fn new(status: u16, detail: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            kind: "about:blank".to_owned(),
            title: reason_phrase(status).to_owned(),
            detail: detail.into(),
            instance: instance.into(),
            status,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Serializes into a response with matching status and
    /// `application/problem+json` content type.
    pub fn into_response(self) -> Response {
        let status = self.status;
        // ProblemDetail contains only strings and integers; serialization
        // cannot fail. The fallback keeps the status either way.
        let body = serde_json::to_vec(&self).unwrap_or_default();
        let mut resp = Response::builder().bytes(ContentType::ProblemJson, body);
        resp.status = status;
        resp
    }
}

/// Renders an [`AppError`] into its wire form. The terminal translation —
/// called once per failed request by the router boundary.
pub(crate) fn render(err: &AppError, instance: &str, request_id: Option<&str>) -> Response {
    let mut problem = ProblemDetail::new(err.status(), err.client_message(), instance);
    if let Some(id) = request_id {
        problem = problem.with_request_id(id);
    }
    problem.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn body_shape_matches_the_wire_contract() {
        let err = AppError::not_found("task 42 does not exist");
        let resp = render(&err, "/tasks/42", Some("req-1"));

        assert_eq!(resp.status_code(), 404);
        assert_eq!(resp.header("content-type"), Some("application/problem+json"));

        let body: ProblemDetail = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.kind, "about:blank");
        assert_eq!(body.title, "Not Found");
        assert_eq!(body.detail, "task 42 does not exist");
        assert_eq!(body.instance, "/tasks/42");
        assert_eq!(body.status, 404);
        assert_eq!(body.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn request_id_is_omitted_when_absent() {
        let err = AppError::validation("title must not be empty");
        let resp = render(&err, "/tasks", None);
        let raw = std::str::from_utf8(resp.body()).unwrap();
        assert!(!raw.contains("request_id"));
    }

    #[test]
    fn internal_detail_never_reaches_the_body() {
        let err = AppError::internal("connection pool exhausted at 10.0.0.3");
        let resp = render(&err, "/tasks", None);
        let body: ProblemDetail = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.detail, "internal server error");
        assert!(!std::str::from_utf8(resp.body()).unwrap().contains("10.0.0.3"));
    }

    #[test]
    fn status_field_always_matches_response_status() {
        for (err, expected) in [
            (AppError::validation("v"), 400),
            (AppError::authentication("a"), 401),
            (AppError::conflict("c"), 409),
            (AppError::new("x", "x").with_status(Status::ServiceUnavailable), 503),
        ] {
            let resp = render(&err, "/", None);
            let body: ProblemDetail = serde_json::from_slice(resp.body()).unwrap();
            assert_eq!(resp.status_code(), expected);
            assert_eq!(body.status, expected);
        }
    }
}
