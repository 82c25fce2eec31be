// Request/response DTOs for the user endpoints

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Role;

/// Login request DTO
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email)]
    #[schema(example = "jane@example.com")]
    pub email: String,
}

/// Token pair returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[schema(example = 300)]
    pub expires_in: i64,
}

/// Admin request to replace a user's role
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ChangeRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

/// Active roles of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRolesResponse {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validates_email() {
        let ok = LoginRequest {
            email: "jane@example.com".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "not-an-email".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_login_request_rejects_unknown_fields() {
        let parsed: Result<LoginRequest, _> =
            serde_json::from_str(r#"{"email":"jane@example.com","password":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_change_role_request_rejects_unknown_role() {
        let parsed: Result<ChangeRoleRequest, _> = serde_json::from_str(
            r#"{"user_id":"6f1c2d3e-4b5a-4c6d-8e9f-0a1b2c3d4e5f","role":"superuser"}"#,
        );
        assert!(parsed.is_err());

        let parsed: ChangeRoleRequest = serde_json::from_str(
            r#"{"user_id":"6f1c2d3e-4b5a-4c6d-8e9f-0a1b2c3d4e5f","role":"asset_manager"}"#,
        )
        .unwrap();
        assert_eq!(parsed.role, Role::AssetManager);
    }
}
