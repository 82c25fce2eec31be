// HTTP handlers for the user endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::IdentityContext;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::users::models::{
    ChangeRoleRequest, LoginRequest, LoginResponse, MessageResponse, UserRolesResponse,
};

/// Login with an email address
#[utoipa::path(
    post,
    path = "/api/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unknown email or no active role")
    ),
    tag = "users"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    tracing::debug!("UserLogin request received");
    request.validate()?;

    let response = state.users.login(&request.email).await?;
    Ok(Json(response))
}

/// Identity attached to the current request
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Caller identity", body = IdentityContext),
        (status = 401, description = "Missing, invalid or unrenewable credentials")
    ),
    params(
        ("Authorization" = String, Header, description = "Access token"),
        ("refresh_token" = Option<String>, Header, description = "Refresh token, used when the access token has expired")
    ),
    tag = "users"
)]
pub async fn me_handler(identity: IdentityContext) -> Json<IdentityContext> {
    Json(identity)
}

/// Active roles of an employee
#[utoipa::path(
    get,
    path = "/api/employee/role/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Active roles", body = UserRolesResponse),
        (status = 403, description = "Caller is not an employee manager or admin")
    ),
    tag = "employee"
)]
pub async fn user_roles_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserRolesResponse>, ApiError> {
    Ok(Json(state.users.user_roles(user_id).await?))
}

/// Replace a user's role (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/employee/change-permissions",
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = MessageResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has this role")
    ),
    tag = "admin"
)]
pub async fn change_role_handler(
    State(state): State<AppState>,
    identity: IdentityContext,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let changed_by = Uuid::parse_str(identity.subject_id()).map_err(|_| {
        ApiError::InternalError(format!(
            "authenticated subject '{}' is not a user id",
            identity.subject_id()
        ))
    })?;

    state
        .users
        .change_role(request.user_id, request.role, changed_by)
        .await?;
    Ok(Json(MessageResponse::new("user role changed successfully")))
}
