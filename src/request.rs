//! Incoming HTTP request type.
//!
//! A [`Request`] is built by the server from a fully-read hyper request, or
//! by tests through [`Request::builder`]. Request-scoped values — matched
//! route pattern, authenticated principal, request id — travel in the typed
//! extensions map, one private key type per concern, so middleware cannot
//! collide with each other.

use std::collections::HashMap;

use bytes::Bytes;
use http::Extensions;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::status::Status;

/// Per-request correlation id, generated by the router before dispatch and
/// echoed back in the `x-request-id` response header.
#[derive(Clone, Debug)]
pub struct RequestId(pub(crate) String);

impl RequestId {
    /// The id from the request context, if the router put one there.
    pub fn from_request(req: &Request) -> Option<&RequestId> {
        req.extensions().get::<RequestId>()
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

/// An incoming HTTP request.
pub struct Request {
    parts: http::request::Parts,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes) -> Self {
        Self { parts, body, params: HashMap::new() }
    }

    /// Builder for constructing requests by hand — handler unit tests, mostly.
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: "GET".to_owned(),
            uri: "/".to_owned(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Uppercase method string, e.g. `"GET"`.
    pub fn method(&self) -> &str { self.parts.method.as_str() }

    /// Request path, without query string. The asterisk-form request target
    /// (`OPTIONS *`) reads as `"*"`.
    pub fn path(&self) -> &str { self.parts.uri.path() }

    /// Case-insensitive header lookup. Non-UTF-8 header values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body bytes, fully read before the handler runs.
    pub fn body(&self) -> &[u8] { &self.body }

    /// Deserialises the body as JSON.
    ///
    /// Failure is a `400` validation error: the serde detail goes to the log,
    /// the client sees a stable message.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            AppError::new(format!("invalid request body: {e}"), "invalid request body")
                .with_status(Status::BadRequest)
                .with_cause(e)
        })
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/tasks/{id}`, `req.param("id")` on `/tasks/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Request-scoped typed values. Prefer the typed accessors
    /// ([`RoutePattern::from_request`](crate::RoutePattern::from_request),
    /// [`Principal::from_request`](crate::middleware::Principal::from_request))
    /// over poking at this directly.
    pub fn extensions(&self) -> &Extensions { &self.parts.extensions }

    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.parts.extensions }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl RequestBuilder {
    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_owned();
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_owned();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// # Panics
    ///
    /// Panics on a malformed method, URI, or header — builder misuse is a
    /// test bug, not a runtime condition.
    pub fn build(self) -> Request {
        let mut builder = http::Request::builder()
            .method(self.method.as_str())
            .uri(self.uri.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let (parts, ()) = builder.body(()).expect("malformed test request").into_parts();
        Request::new(parts, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct CreateTask {
        title: String,
    }

    #[test]
    fn accessors_reflect_the_built_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/tasks?verbose=1")
            .header("authorization", "Bearer abc")
            .body(&br#"{"title":"write tests"}"#[..])
            .build();

        assert_eq!(req.method(), "POST");
        assert_eq!(req.path(), "/tasks");
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        let parsed: CreateTask = req.json().unwrap();
        assert_eq!(parsed.title, "write tests");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/tasks")
            .body(&b"{not json"[..])
            .build();

        let err = req.json::<CreateTask>().unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.client_message(), "invalid request body");
    }

    #[test]
    fn params_are_exposed_by_name() {
        let mut req = Request::builder().uri("/tasks/42").build();
        req.set_params(HashMap::from([("id".to_owned(), "42".to_owned())]));
        assert_eq!(req.param("id"), Some("42"));
        assert_eq!(req.param("missing"), None);
    }
}
