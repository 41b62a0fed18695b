use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{admin_users, pending_confirmations};

/// Proof-of-ownership rows for registration and password reset.
///
/// At most one row per (email, kind) is authoritative: the most recent
/// non-completed one. Re-issuing overwrites that row instead of appending,
/// which is what invalidates previously emailed codes.
pub struct ConfirmationRepository {
    conn: DatabaseConnection,
}

impl ConfirmationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Upsert the active pending row for (email, kind) with a fresh
    /// code/token/expiry. Attempts reset to zero.
    pub async fn issue(
        &self,
        email: &str,
        kind: &str,
        code: String,
        token: String,
        ttl: Duration,
    ) -> Result<pending_confirmations::Model> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let existing = self.latest_active(email, kind).await?;

        let model = if let Some(row) = existing {
            let mut active: pending_confirmations::ActiveModel = row.into();
            active.code = Set(code);
            active.token = Set(token);
            active.expires_at = Set(expires_at);
            active.attempts = Set(0);
            active.created_at = Set(now);
            active
                .update(&self.conn)
                .await
                .context("Failed to overwrite pending confirmation")?
        } else {
            let active = pending_confirmations::ActiveModel {
                email: Set(email.to_string()),
                code: Set(code),
                token: Set(token),
                kind: Set(kind.to_string()),
                expires_at: Set(expires_at),
                attempts: Set(0),
                completed: Set(false),
                created_at: Set(now),
                ..Default::default()
            };
            active
                .insert(&self.conn)
                .await
                .context("Failed to insert pending confirmation")?
        };

        Ok(model)
    }

    /// Most recent non-completed row for (email, kind), if any.
    pub async fn latest_active(
        &self,
        email: &str,
        kind: &str,
    ) -> Result<Option<pending_confirmations::Model>> {
        pending_confirmations::Entity::find()
            .filter(pending_confirmations::Column::Email.eq(email))
            .filter(pending_confirmations::Column::Kind.eq(kind))
            .filter(pending_confirmations::Column::Completed.eq(false))
            .order_by_desc(pending_confirmations::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query pending confirmation")
    }

    pub async fn find_by_token(
        &self,
        token: &str,
        kind: &str,
    ) -> Result<Option<pending_confirmations::Model>> {
        pending_confirmations::Entity::find()
            .filter(pending_confirmations::Column::Token.eq(token))
            .filter(pending_confirmations::Column::Kind.eq(kind))
            .filter(pending_confirmations::Column::Completed.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query confirmation by token")
    }

    /// Bumps the wrong-code counter by exactly one; no other state changes.
    pub async fn increment_attempts(&self, id: i32) -> Result<()> {
        pending_confirmations::Entity::update_many()
            .col_expr(
                pending_confirmations::Column::Attempts,
                Expr::col(pending_confirmations::Column::Attempts).add(1),
            )
            .filter(pending_confirmations::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to increment confirmation attempts")?;

        Ok(())
    }

    /// Marks the row completed and, when `activate_email` is given, flips
    /// the matching admin to active + verified. Both updates run in one
    /// transaction, and completion is guarded so it happens exactly once:
    /// a row that is already completed yields `Ok(false)`.
    pub async fn complete(&self, id: i32, activate_email: Option<&str>) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let result = pending_confirmations::Entity::update_many()
            .col_expr(pending_confirmations::Column::Completed, Expr::value(true))
            .filter(pending_confirmations::Column::Id.eq(id))
            .filter(pending_confirmations::Column::Completed.eq(false))
            .exec(&txn)
            .await
            .context("Failed to complete confirmation")?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        if let Some(email) = activate_email {
            admin_users::Entity::update_many()
                .col_expr(admin_users::Column::Active, Expr::value(true))
                .col_expr(admin_users::Column::EmailVerified, Expr::value(true))
                .col_expr(admin_users::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(admin_users::Column::Email.eq(email))
                .exec(&txn)
                .await
                .context("Failed to activate admin account")?;
        }

        txn.commit().await?;
        Ok(true)
    }

    pub async fn count_pending(&self) -> Result<u64> {
        pending_confirmations::Entity::find()
            .filter(pending_confirmations::Column::Completed.eq(false))
            .filter(pending_confirmations::Column::ExpiresAt.gt(Utc::now()))
            .count(&self.conn)
            .await
            .context("Failed to count pending confirmations")
    }

    /// Deletes completed rows and rows that expired more than
    /// `retention_days` ago.
    pub async fn prune(&self, retention_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);

        let result = pending_confirmations::Entity::delete_many()
            .filter(
                pending_confirmations::Column::Completed
                    .eq(true)
                    .or(pending_confirmations::Column::ExpiresAt.lt(cutoff)),
            )
            .exec(&self.conn)
            .await
            .context("Failed to prune confirmations")?;

        Ok(result.rows_affected)
    }
}
