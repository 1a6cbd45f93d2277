//! Client-visible error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::backend::BackendError;
use crate::dispatch::coerce::CoercionError;
use crate::dispatch::operations::UNSUPPORTED_MESSAGE;
use crate::http::response::json_error;

/// Errors a request can end with.
///
/// Cache faults never appear here; the response cache absorbs them.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No recognised operation flag in the query string.
    #[error("{}", UNSUPPORTED_MESSAGE)]
    UnsupportedOperation,

    /// A supplied value could not be coerced to its parameter type.
    #[error(transparent)]
    ParameterCoercion(#[from] CoercionError),

    /// The backend call reported failure.
    #[error(transparent)]
    BackendCall(#[from] BackendError),
}

impl GatewayError {
    /// HTTP status for this error.
    ///
    /// Every kind maps to 400 for compatibility with existing clients.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnsupportedOperation => StatusCode::BAD_REQUEST,
            GatewayError::ParameterCoercion(_) => StatusCode::BAD_REQUEST,
            GatewayError::BackendCall(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnsupportedOperation => "unsupported_operation",
            GatewayError::ParameterCoercion(_) => "parameter_coercion",
            GatewayError::BackendCall(_) => "backend_call",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        json_error(self.status(), &self.to_string())
    }
}
