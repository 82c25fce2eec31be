// Current role assignments for a user, read at token renewal time

use axum::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::role::Role;

#[derive(Debug, Error)]
pub enum RoleLookupError {
    #[error("invalid user id '{0}'")]
    InvalidUserId(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Source of a user's active (non-archived) roles
///
/// Implementations must only report assignments that are currently active.
/// At most one role is expected per user, but callers accept a set.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn active_roles(&self, user_id: &str) -> Result<Vec<Role>, RoleLookupError>;
}

/// RoleLookup backed by the `user_roles` table
#[derive(Clone)]
pub struct PgRoleLookup {
    pool: PgPool,
}

impl PgRoleLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleLookup for PgRoleLookup {
    async fn active_roles(&self, user_id: &str) -> Result<Vec<Role>, RoleLookupError> {
        let id = Uuid::parse_str(user_id)
            .map_err(|_| RoleLookupError::InvalidUserId(user_id.to_string()))?;

        // Most recent active assignment is the effective role
        let row: Option<String> = sqlx::query_scalar(
            r#"
            SELECT role FROM user_roles
            WHERE user_id = $1 AND archived_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let roles = match row {
            Some(name) => match name.parse::<Role>() {
                Ok(role) => vec![role],
                Err(e) => {
                    warn!("Ignoring unrecognised role for user {}: {}", user_id, e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!("Active roles for user {}: {:?}", user_id, roles);
        Ok(roles)
    }
}
