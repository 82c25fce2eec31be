// User service - login and role management

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthError, Role, RoleLookup, TokenService};
use crate::error::ApiError;
use crate::users::{
    models::{LoginResponse, UserRolesResponse},
    repository::{RoleChange, UserStore},
};

/// Coordinates user lookups, role lookups and token issuing
pub struct UserService {
    store: Arc<dyn UserStore>,
    roles: Arc<dyn RoleLookup>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        roles: Arc<dyn RoleLookup>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            roles,
            tokens,
        }
    }

    /// Login by email
    ///
    /// Unknown emails and users without an active role get the same
    /// `InvalidLogin` rejection.
    pub async fn login(&self, email: &str) -> Result<LoginResponse, ApiError> {
        let user_id = self
            .store
            .find_active_user_id(email)
            .await?
            .ok_or_else(|| {
                warn!("Login attempt for unknown email");
                AuthError::InvalidLogin
            })?;

        let roles = self.active_roles(&user_id).await?;
        if roles.is_empty() {
            warn!("Login attempt for user {} without an active role", user_id);
            return Err(AuthError::InvalidLogin.into());
        }

        let pair = self.tokens.issue_pair(&user_id.to_string(), &roles)?;
        info!("User {} logged in", user_id);

        Ok(LoginResponse {
            user_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: self.tokens.access_token_duration(),
        })
    }

    /// Active roles of a user
    pub async fn user_roles(&self, user_id: Uuid) -> Result<UserRolesResponse, ApiError> {
        let roles = self.active_roles(&user_id).await?;
        Ok(UserRolesResponse { user_id, roles })
    }

    /// Replace a user's role; takes effect at their next token rotation
    pub async fn change_role(&self, user_id: Uuid, role: Role, changed_by: Uuid) -> Result<(), ApiError> {
        match self.store.replace_role(user_id, role, changed_by).await? {
            RoleChange::Replaced => {}
            RoleChange::Unchanged => {
                return Err(ApiError::Conflict("user already has this role".to_string()));
            }
            RoleChange::UserNotFound => {
                return Err(ApiError::NotFound {
                    resource: "User".to_string(),
                    id: user_id.to_string(),
                });
            }
        }

        info!("User {} changed role of {} to {}", changed_by, user_id, role);
        Ok(())
    }

    async fn active_roles(&self, user_id: &Uuid) -> Result<Vec<Role>, ApiError> {
        self.roles
            .active_roles(&user_id.to_string())
            .await
            .map_err(|e| AuthError::RoleLookupFailed(e.to_string()).into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::middleware::tests::StaticRoleLookup;
    use crate::auth::token::tests::test_token_service;
    use axum::{async_trait, http::StatusCode};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory UserStore
    #[derive(Default)]
    pub(crate) struct MemoryUserStore {
        pub(crate) users: HashMap<String, Uuid>,
        pub(crate) changes: Mutex<Vec<(Uuid, Role, Uuid)>>,
        pub(crate) current: Mutex<HashMap<Uuid, Role>>,
    }

    impl MemoryUserStore {
        pub(crate) fn with_user(email: &str, id: Uuid) -> Self {
            let mut store = Self::default();
            store.users.insert(email.to_lowercase(), id);
            store
        }

        pub(crate) fn with_role(self, id: Uuid, role: Role) -> Self {
            self.current.lock().unwrap().insert(id, role);
            self
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_active_user_id(&self, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
            Ok(self.users.get(&email.to_lowercase()).copied())
        }

        async fn replace_role(
            &self,
            user_id: Uuid,
            role: Role,
            changed_by: Uuid,
        ) -> Result<RoleChange, sqlx::Error> {
            if !self.users.values().any(|id| *id == user_id) {
                return Ok(RoleChange::UserNotFound);
            }
            let mut current = self.current.lock().unwrap();
            if current.get(&user_id) == Some(&role) {
                return Ok(RoleChange::Unchanged);
            }
            current.insert(user_id, role);
            self.changes.lock().unwrap().push((user_id, role, changed_by));
            Ok(RoleChange::Replaced)
        }
    }

    fn service(store: MemoryUserStore, lookup: StaticRoleLookup) -> UserService {
        UserService::new(Arc::new(store), Arc::new(lookup), Arc::new(test_token_service()))
    }

    #[tokio::test]
    async fn test_login_issues_tokens_with_active_role() {
        let id = Uuid::new_v4();
        let svc = service(
            MemoryUserStore::with_user("jane@example.com", id),
            StaticRoleLookup::with(&id.to_string(), &[Role::AssetManager]),
        );

        let response = svc.login("Jane@Example.com").await.unwrap();
        assert_eq!(response.user_id, id);
        assert_eq!(response.expires_in, 300);

        let tokens = test_token_service();
        let verified = tokens.verify_access(&response.access_token).unwrap();
        assert_eq!(verified.subject, id.to_string());
        assert_eq!(verified.roles, vec![Role::AssetManager]);
        assert_eq!(tokens.verify_refresh(&response.refresh_token).unwrap(), id.to_string());
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_rejected() {
        let svc = service(MemoryUserStore::default(), StaticRoleLookup::default());
        let err = svc.login("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::InvalidLogin)));
    }

    #[tokio::test]
    async fn test_login_without_active_role_is_rejected() {
        let id = Uuid::new_v4();
        let svc = service(
            MemoryUserStore::with_user("jane@example.com", id),
            StaticRoleLookup::default(),
        );
        let err = svc.login("jane@example.com").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::InvalidLogin)));
    }

    #[tokio::test]
    async fn test_change_role_for_unknown_user_is_not_found() {
        let svc = service(MemoryUserStore::default(), StaticRoleLookup::default());
        let err = svc
            .change_role(Uuid::new_v4(), Role::Admin, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_change_role_records_change() {
        let id = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let store = Arc::new(MemoryUserStore::with_user("jane@example.com", id));
        let svc = UserService::new(
            store.clone(),
            Arc::new(StaticRoleLookup::default()),
            Arc::new(test_token_service()),
        );

        svc.change_role(id, Role::EmployeeManager, admin).await.unwrap();
        assert_eq!(
            store.changes.lock().unwrap().as_slice(),
            &[(id, Role::EmployeeManager, admin)]
        );
    }

    #[tokio::test]
    async fn test_change_role_to_current_role_is_conflict() {
        let id = Uuid::new_v4();
        let store = Arc::new(
            MemoryUserStore::with_user("jane@example.com", id).with_role(id, Role::Admin),
        );
        let svc = UserService::new(
            store.clone(),
            Arc::new(StaticRoleLookup::default()),
            Arc::new(test_token_service()),
        );

        let err = svc.change_role(id, Role::Admin, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref msg) if msg == "user already has this role"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(store.changes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_change_role_writes_once() {
        let id = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let store = Arc::new(MemoryUserStore::with_user("jane@example.com", id));
        let svc = UserService::new(
            store.clone(),
            Arc::new(StaticRoleLookup::default()),
            Arc::new(test_token_service()),
        );

        svc.change_role(id, Role::Employee, admin).await.unwrap();
        let err = svc.change_role(id, Role::Employee, admin).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(store.changes.lock().unwrap().len(), 1);
    }
}
