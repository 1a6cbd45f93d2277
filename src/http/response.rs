//! Response formatting.
//!
//! # Responsibilities
//! - Emit backend payloads unmodified as JSON
//! - Emit errors as a single-field `{"error": ...}` envelope
//!
//! # Design Decisions
//! - The payload is never parsed or re-serialized
//! - The caller chooses the status; the envelope is the same for every error

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

const APPLICATION_JSON: &str = "application/json";

/// A successful response carrying the backend's JSON text as-is.
pub fn json_payload(payload: Bytes) -> Response {
    ([(header::CONTENT_TYPE, APPLICATION_JSON)], payload).into_response()
}

/// An error response with body `{"error":"<message>"}`.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    (status, [(header::CONTENT_TYPE, APPLICATION_JSON)], body).into_response()
}
