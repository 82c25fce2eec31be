// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use thiserror::Error;
use tracing::error;

use crate::error::ErrorResponse;

/// Every way the auth pipeline can reject a request
///
/// All variants are terminal for the current request. Collaborator faults
/// (role lookup, signing) are server-class; everything else is caller-class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No access token on the request
    #[error("missing access token")]
    CredentialMissing,

    /// Bad signature, malformed token or unexpected algorithm
    #[error("unauthorized")]
    CredentialInvalid,

    /// Valid signature but past `exp`; the only error eligible for renewal
    #[error("access token expired")]
    CredentialExpired,

    #[error("access token expired, and refresh token missing")]
    RefreshMissing,

    #[error("invalid or expired refresh token")]
    RefreshInvalid,

    #[error("failed to fetch roles: {0}")]
    RoleLookupFailed(String),

    #[error("role lookup timed out")]
    RoleLookupTimedOut,

    #[error("failed to generate access token: {0}")]
    AccessSigningFailed(String),

    #[error("failed to generate refresh token: {0}")]
    RefreshSigningFailed(String),

    /// Caller is authenticated but holds none of the allowed roles
    #[error("forbidden")]
    Forbidden,

    /// Identity was requested but the auth layer never ran
    #[error("identity not found in request")]
    ContextMissing,

    /// Login with an unknown email or a user without an active role
    #[error("invalid email")]
    InvalidLogin,
}

impl AuthError {
    /// HTTP status code surfaced for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::CredentialMissing
            | AuthError::CredentialInvalid
            | AuthError::CredentialExpired
            | AuthError::RefreshMissing
            | AuthError::RefreshInvalid
            | AuthError::ContextMissing
            | AuthError::InvalidLogin => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::RoleLookupTimedOut => StatusCode::GATEWAY_TIMEOUT,
            AuthError::RoleLookupFailed(_)
            | AuthError::AccessSigningFailed(_)
            | AuthError::RefreshSigningFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable reason sent to clients
    ///
    /// Never includes collaborator details; those only go to the log.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::CredentialMissing => "missing access token",
            AuthError::CredentialInvalid => "unauthorized",
            AuthError::CredentialExpired => "access token expired",
            AuthError::RefreshMissing => "access token expired, and refresh token missing",
            AuthError::RefreshInvalid => "invalid or expired refresh token",
            AuthError::RoleLookupFailed(_) => "failed to fetch roles",
            AuthError::RoleLookupTimedOut => "role lookup timed out",
            AuthError::AccessSigningFailed(_) => "failed to generate access token",
            AuthError::RefreshSigningFailed(_) => "failed to generate refresh token",
            AuthError::Forbidden => "forbidden",
            AuthError::ContextMissing => "unauthorized",
            AuthError::InvalidLogin => "invalid email",
        }
    }

    fn error_code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::GATEWAY_TIMEOUT => "TIMEOUT",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Rejections are logged where the request context is known
        if self.is_server_fault() {
            error!("Auth pipeline fault: {}", self);
        }

        let body = ErrorResponse {
            error_code: self.error_code().to_string(),
            message: self.reason().to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_map_to_401_or_403() {
        assert_eq!(AuthError::CredentialMissing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::CredentialInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::RefreshMissing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::RefreshInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ContextMissing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_collaborator_faults_are_server_errors() {
        assert!(AuthError::RoleLookupFailed("db down".into()).is_server_fault());
        assert!(AuthError::AccessSigningFailed("boom".into()).is_server_fault());
        assert!(AuthError::RefreshSigningFailed("boom".into()).is_server_fault());
        assert!(AuthError::RoleLookupTimedOut.is_server_fault());
        assert!(!AuthError::RefreshInvalid.is_server_fault());
    }

    #[test]
    fn test_reason_hides_collaborator_details() {
        let err = AuthError::RoleLookupFailed("connection refused on 10.0.0.3".into());
        assert_eq!(err.reason(), "failed to fetch roles");
    }

    #[tokio::test]
    async fn test_response_body_carries_reason() {
        let response = AuthError::RefreshMissing.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "access token expired, and refresh token missing");
        assert_eq!(body["error_code"], "UNAUTHORIZED");
    }
}
