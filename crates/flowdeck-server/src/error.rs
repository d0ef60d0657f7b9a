//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Authentication failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database/storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<flowdeck_store::StoreError> for ServerError {
    fn from(e: flowdeck_store::StoreError) -> Self {
        match e {
            flowdeck_store::StoreError::NotFound(msg) => ServerError::NotFound(msg),
            flowdeck_store::StoreError::Invalid(msg) => ServerError::BadRequest(msg),
            flowdeck_store::StoreError::Serde(e) => ServerError::Serialization(e),
            flowdeck_store::StoreError::Database(e) => ServerError::Storage(e.to_string()),
        }
    }
}

impl From<flowdeck_types::DocumentError> for ServerError {
    fn from(e: flowdeck_types::DocumentError) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ServerError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            ServerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        // Internal detail goes to the log, not the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(status = %status, code, error = %self, "Server error");
            "Internal server error".to_string()
        } else {
            tracing::warn!(status = %status, code, error = %self, "Client error");
            self.to_string()
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err: ServerError = flowdeck_store::StoreError::NotFound("workflow x".into()).into();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn test_document_error_maps_to_bad_request() {
        let err: ServerError =
            flowdeck_types::DocumentError::Invalid("no start node".into()).into();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response = ServerError::Internal("secret db path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
