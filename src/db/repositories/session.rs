use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::entities::{admin_sessions, admin_users};

/// Login audit rows doubling as the backing check for bearer-token auth.
pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        admin_id: i32,
        token: String,
        ip: String,
        user_agent: String,
        ttl_minutes: i64,
    ) -> Result<admin_sessions::Model> {
        let now = Utc::now();

        let active = admin_sessions::ActiveModel {
            token: Set(token),
            admin_id: Set(admin_id),
            ip: Set(ip),
            user_agent: Set(user_agent),
            expires_at: Set(now + Duration::minutes(ttl_minutes)),
            active: Set(true),
            created_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin session")
    }

    /// Resolves a token to its admin when the session row is active and
    /// unexpired and the account itself is still active.
    pub async fn validate(&self, token: &str) -> Result<Option<admin_users::Model>> {
        let session = admin_sessions::Entity::find()
            .filter(admin_sessions::Column::Token.eq(token))
            .filter(admin_sessions::Column::Active.eq(true))
            .filter(admin_sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.conn)
            .await
            .context("Failed to query admin session")?;

        let Some(session) = session else {
            return Ok(None);
        };

        let admin = admin_users::Entity::find_by_id(session.admin_id)
            .filter(admin_users::Column::Active.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query session owner")?;

        Ok(admin)
    }

    /// Flips the session row inactive. Returns false for unknown tokens.
    pub async fn deactivate(&self, token: &str) -> Result<bool> {
        let result = admin_sessions::Entity::update_many()
            .col_expr(admin_sessions::Column::Active, Expr::value(false))
            .filter(admin_sessions::Column::Token.eq(token))
            .filter(admin_sessions::Column::Active.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to deactivate session")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_active(&self) -> Result<u64> {
        admin_sessions::Entity::find()
            .filter(admin_sessions::Column::Active.eq(true))
            .filter(admin_sessions::Column::ExpiresAt.gt(Utc::now()))
            .count(&self.conn)
            .await
            .context("Failed to count active sessions")
    }

    /// Marks expired rows inactive so the audit trail stays but the
    /// tokens stop validating.
    pub async fn prune_expired(&self) -> Result<u64> {
        let result = admin_sessions::Entity::update_many()
            .col_expr(admin_sessions::Column::Active, Expr::value(false))
            .filter(admin_sessions::Column::Active.eq(true))
            .filter(admin_sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.conn)
            .await
            .context("Failed to prune expired sessions")?;

        Ok(result.rows_affected)
    }
}
