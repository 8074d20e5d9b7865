//! HTTP responses produced by the guard layer itself.
//!
//! Every rejection carries the same body whatever the internal reason was,
//! so callers learn nothing beyond "not authorized".

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;

/// Response body type used throughout the service.
pub type GuardBody = Full<Bytes>;

/// Message returned with every rejection.
pub const REJECTION_MESSAGE: &str = "not authorized";

/// Build a JSON rejection response with the given status.
///
/// ```text
/// {"status": "403", "message": "not authorized"}
/// ```
#[must_use]
pub fn rejection_response(status: StatusCode) -> Response<GuardBody> {
    let body = serde_json::json!({
        "status": status.as_u16().to_string(),
        "message": REJECTION_MESSAGE,
    });
    json_response(status, &body)
}

/// Response for paths with no registered route.
#[must_use]
pub fn not_found_response() -> Response<GuardBody> {
    let body = serde_json::json!({
        "status": StatusCode::NOT_FOUND.as_u16().to_string(),
        "message": "not found",
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

/// Response for a request whose body could not be read.
#[must_use]
pub fn bad_request_response() -> Response<GuardBody> {
    let body = serde_json::json!({
        "status": StatusCode::BAD_REQUEST.as_u16().to_string(),
        "message": "failed to read request body",
    });
    json_response(StatusCode::BAD_REQUEST, &body)
}

/// Produce a health check response.
#[must_use]
pub fn health_check_response() -> Response<GuardBody> {
    json_response(StatusCode::OK, &serde_json::json!({ "status": "running" }))
}

/// A plain-text response, mostly for route handlers.
#[must_use]
pub fn text_response(status: StatusCode, text: impl Into<Bytes>) -> Response<GuardBody> {
    let mut response = Response::new(Full::new(text.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<GuardBody> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
