//! Request-level failures and their HTTP mapping.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Ways the handler can refuse a request.
///
/// Per-URL fetch failures are not here: they are absorbed by the fan-out.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("too many connections")]
    AdmissionRejected,

    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),

    #[error("{0}")]
    BodyRead(String),
}

impl HandleError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandleError::AdmissionRejected => StatusCode::SERVICE_UNAVAILABLE,
            HandleError::MethodNotAllowed(_) => StatusCode::NOT_FOUND,
            HandleError::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HandleError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
