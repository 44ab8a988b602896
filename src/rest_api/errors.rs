//! # REST API Errors
//!
//! Error taxonomy for resource registration and request handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// REST API errors
#[derive(Debug, Clone, Error)]
pub enum RestError {
    // ==================
    // Setup Errors
    // ==================
    /// Invalid registration options; raised while building routes, never per request
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ==================
    // Client Errors (4xx)
    // ==================
    /// Missing or invalid content type, malformed input, schema validation failure
    #[error("Validation failed: {description}")]
    Validation { description: String },

    /// No matching document for an id-scoped operation
    #[error("Not Found")]
    NotFound,

    // ==================
    // Collaborator Errors
    // ==================
    /// Underlying collection operation failed
    #[error("Store error: {message}")]
    Store { status: u16, message: String },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Internal error during request handling
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestError {
    /// Create a validation error
    pub fn validation(description: impl Into<String>) -> Self {
        Self::Validation {
            description: description.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::Validation { .. } => StatusCode::BAD_REQUEST,
            RestError::NotFound => StatusCode::NOT_FOUND,
            RestError::Store { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RestError::Configuration(_) | RestError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short description handed to the error reporter
    pub fn description(&self) -> String {
        match self {
            RestError::Validation { description } => description.clone(),
            RestError::Store { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for RestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => RestError::validation(msg),
            other => RestError::Store {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&RestError> for ErrorResponse {
    fn from(err: &RestError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.description(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RestError::validation("missing_content_type").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RestError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            RestError::Internal("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_propagation() {
        let cast = StoreError::Cast {
            path: "_id".to_string(),
            value: "invalid-id".to_string(),
        };
        assert_eq!(RestError::from(cast).status_code(), StatusCode::BAD_REQUEST);

        let backend = StoreError::backend("connection reset");
        assert_eq!(
            RestError::from(backend).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let invalid = StoreError::Validation("Path `name` is required.".to_string());
        assert!(matches!(
            RestError::from(invalid),
            RestError::Validation { .. }
        ));
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from(&RestError::validation("invalid_content_type"));
        assert_eq!(body.code, 400);
        assert_eq!(body.error, "invalid_content_type");
    }
}
