//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Read form-encoded bodies within the size limit, rejecting larger ones
//!   with the JSON error envelope
//! - Turn the axum request into a `GatewayRequest`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Only `POST`/`PUT`/`PATCH` form bodies contribute named values

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::dispatch::GatewayRequest;
use crate::http::response::json_error;

pub const X_REQUEST_ID: &str = "x-request-id";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Generates an `x-request-id` for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID header value, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Whether named values should be read from the request body.
pub fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    let method_allows = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with(FORM_URLENCODED))
        .unwrap_or(false);
    method_allows && is_form
}

/// Build a `GatewayRequest`, reading a form body of at most `body_limit` bytes.
pub async fn read_gateway_request(
    request: Request<Body>,
    body_limit: usize,
) -> Result<GatewayRequest, Response> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    if !has_form_body(&parts.method, &parts.headers) {
        return Ok(GatewayRequest::new(path_and_query, None));
    }

    // Declared length (Content-Length) is checked before reading anything.
    if body.size_hint().lower() > body_limit as u64 {
        tracing::debug!(declared = body.size_hint().lower(), limit = body_limit, "Form body too large");
        return Err(json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("request body exceeds {} bytes", body_limit),
        ));
    }

    let bytes = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to read form body");
        json_error(StatusCode::BAD_REQUEST, &format!("failed to read request body: {}", e))
    })?;
    Ok(GatewayRequest::new(path_and_query, Some(&bytes)))
}
