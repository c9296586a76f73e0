//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted — `Response::status()`,
//! `Response::builder().status()`, or `AppError::with_status()`.
//!
//! ```rust
//! use taskd::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::Created)
//!     .header("location", "/tasks/42")
//!     .json(br#"{"id":42}"#.to_vec());
//! ```

/// The status codes this service emits.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    Accepted,            // 202
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    MethodNotAllowed,    // 405
    Conflict,            // 409
    UnprocessableContent, // 422
    TooManyRequests,     // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    NotImplemented,      // 501
    BadGateway,          // 502
    ServiceUnavailable,  // 503
    GatewayTimeout,      // 504
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                   => 200,
            Status::Created              => 201,
            Status::Accepted             => 202,
            Status::NoContent            => 204,
            Status::BadRequest           => 400,
            Status::Unauthorized         => 401,
            Status::Forbidden            => 403,
            Status::NotFound             => 404,
            Status::MethodNotAllowed     => 405,
            Status::Conflict             => 409,
            Status::UnprocessableContent => 422,
            Status::TooManyRequests      => 429,
            Status::InternalServerError  => 500,
            Status::NotImplemented       => 501,
            Status::BadGateway           => 502,
            Status::ServiceUnavailable   => 503,
            Status::GatewayTimeout       => 504,
        }
    }
}

/// IANA reason phrase for a raw status code. Unknown codes get an empty
/// phrase rather than a panic — hyper tolerates it on the wire.
pub(crate) fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Content",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _   => "",
    }
}
