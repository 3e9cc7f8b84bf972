//! Error types for the PDF Deck server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfdeck_core::DeckError;
use serde::Serialize;
use thiserror::Error;

/// Server error taxonomy. Every variant maps to a stable string code in
/// the response body.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Pdf(#[from] DeckError),

    #[error("Backend timeout")]
    Timeout,

    #[error("No {0} backend configured")]
    BackendUnavailable(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl ServerError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::Pdf(DeckError::Parse(_)) => "PARSE_ERROR",
            ServerError::Pdf(DeckError::InvalidRange(_)) => "INVALID_RANGE",
            ServerError::Pdf(DeckError::InvalidInput(_)) => "INVALID_INPUT",
            ServerError::Pdf(DeckError::Operation(_)) => "OPERATION_FAILED",
            ServerError::Timeout => "TIMEOUT",
            ServerError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            ServerError::Backend(_) => "BACKEND_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pdf(DeckError::Operation(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pdf(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Backend(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            ServerError::InvalidRequest("x".into()).code(),
            "INVALID_REQUEST"
        );
        assert_eq!(
            ServerError::Pdf(DeckError::Parse("x".into())).code(),
            "PARSE_ERROR"
        );
        assert_eq!(
            ServerError::Pdf(DeckError::InvalidRange("x".into())).code(),
            "INVALID_RANGE"
        );
        assert_eq!(ServerError::Timeout.code(), "TIMEOUT");
        assert_eq!(
            ServerError::BackendUnavailable("OCR").code(),
            "BACKEND_UNAVAILABLE"
        );
    }

    #[test]
    fn test_client_errors_are_4xx() {
        assert!(ServerError::InvalidRequest("x".into()).status().is_client_error());
        assert!(ServerError::Pdf(DeckError::InvalidRange("x".into()))
            .status()
            .is_client_error());
    }

    #[test]
    fn test_backend_errors_are_5xx() {
        assert!(ServerError::Backend("x".into()).status().is_server_error());
        assert!(ServerError::BackendUnavailable("OCR")
            .status()
            .is_server_error());
        assert!(ServerError::Internal("x".into()).status().is_server_error());
    }
}
