// Error handling module for the Asset API
// Provides the service-wide error type and the JSON error body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::AuthError;

/// Main error type for the user-facing handlers
///
/// Auth failures keep their own status and reason; everything else maps to
/// one of the generic buckets below.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body failed validation (400)
    #[error("validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Resource not found by ID (404)
    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    /// Request conflicts with current state (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database failure (500); details stay in the log
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Other server-side failure (500); details stay in the log
    #[error("internal error: {0}")]
    InternalError(String),

    /// Authentication or authorization failure
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Consistent error response structure
///
/// `message` is the stable, machine-matchable reason string.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category, e.g. "UNAUTHORIZED", "NOT_FOUND"
    pub error_code: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Auth(auth_error) => return auth_error.into_response(),
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "invalid input".to_string(),
                    Some(serde_json::to_value(&errors).unwrap_or(serde_json::json!({}))),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{} with id {} not found", resource, id),
                    None,
                )
            }
            ApiError::Conflict(reason) => {
                warn!("Conflict: {}", reason);
                (StatusCode::CONFLICT, "CONFLICT", reason, None)
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "a database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "an internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error_code: error_code.to_string(),
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(auth_error) => auth_error.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_keep_their_status() {
        assert_eq!(
            ApiError::from(AuthError::Forbidden).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidLogin).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_database_errors_are_500() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::NotFound {
            resource: "User".to_string(),
            id: "42".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error_code, "NOT_FOUND");
        assert_eq!(body.message, "User with id 42 not found");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_conflict_body_carries_reason() {
        let response = ApiError::Conflict("user already has this role".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error_code, "CONFLICT");
        assert_eq!(body.message, "user already has this role");
    }
}
