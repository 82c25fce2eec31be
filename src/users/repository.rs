// Database access for users and their role assignments

use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Role;

/// Outcome of a role replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Replaced,
    /// The user's active role already equals the requested one; nothing written
    Unchanged,
    UserNotFound,
}

/// Persistence operations the user service depends on
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Id of the non-archived user with this email (case-insensitive)
    async fn find_active_user_id(&self, email: &str) -> Result<Option<Uuid>, sqlx::Error>;

    /// Archive the user's active role rows and record `role` in their place
    async fn replace_role(
        &self,
        user_id: Uuid,
        role: Role,
        changed_by: Uuid,
    ) -> Result<RoleChange, sqlx::Error>;
}

/// User repository for database operations
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_active_user_id(&self, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM users WHERE LOWER(email) = LOWER($1) AND archived_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn replace_role(
        &self,
        user_id: Uuid,
        role: Role,
        changed_by: Uuid,
    ) -> Result<RoleChange, sqlx::Error> {
        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND archived_at IS NULL)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists.unwrap_or(false) {
            return Ok(RoleChange::UserNotFound);
        }

        let current: Option<String> = sqlx::query_scalar(
            "SELECT role FROM user_roles WHERE user_id = $1 AND archived_at IS NULL \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if current.as_deref() == Some(role.as_str()) {
            return Ok(RoleChange::Unchanged);
        }

        sqlx::query(
            "UPDATE user_roles SET archived_at = NOW() WHERE user_id = $1 AND archived_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_roles (id, user_id, role, created_by) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role.as_str())
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RoleChange::Replaced)
    }
}
