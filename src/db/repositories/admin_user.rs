use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::admin_users;

/// Admin data returned from the repository (without the password hash).
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<admin_users::Model> for AdminUser {
    fn from(model: admin_users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            role: model.role,
            active: model.active,
            email_verified: model.email_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Input for creating an admin account.
#[derive(Debug, Clone)]
pub struct NewAdminUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
}

pub struct AdminUserRepository {
    conn: DatabaseConnection,
}

impl AdminUserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<admin_users::Model>> {
        admin_users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query admin by id")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<admin_users::Model>> {
        admin_users::Entity::find()
            .filter(admin_users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query admin by email")
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = admin_users::Entity::find()
            .filter(admin_users::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count admins by email")?;
        Ok(count > 0)
    }

    pub async fn create(
        &self,
        input: NewAdminUser,
        password_hash: String,
    ) -> Result<admin_users::Model> {
        let now = Utc::now();

        let active = admin_users::ActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            password_hash: Set(password_hash),
            role: Set(input.role),
            active: Set(input.active),
            email_verified: Set(input.email_verified),
            login_attempts: Set(0),
            blocked_until: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin user")
    }

    /// Records a failed login. Returns the new attempt count and whether
    /// this failure triggered a block.
    pub async fn record_failed_login(
        &self,
        id: i32,
        max_attempts: u32,
        lockout_minutes: i64,
    ) -> Result<(i32, bool)> {
        let user = admin_users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query admin for failed-login accounting")?
            .ok_or_else(|| anyhow::anyhow!("Admin {id} not found"))?;

        let attempts = user.login_attempts + 1;
        let blocked = attempts >= i32::try_from(max_attempts).unwrap_or(i32::MAX);

        let mut active: admin_users::ActiveModel = user.into();
        active.login_attempts = Set(attempts);
        if blocked {
            active.blocked_until = Set(Some(Utc::now() + Duration::minutes(lockout_minutes)));
        }
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok((attempts, blocked))
    }

    /// Clears the attempt counter and any block, after a successful login
    /// or a completed password reset.
    pub async fn clear_login_throttle(&self, id: i32) -> Result<()> {
        let user = admin_users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query admin for throttle reset")?
            .ok_or_else(|| anyhow::anyhow!("Admin {id} not found"))?;

        let mut active: admin_users::ActiveModel = user.into();
        active.login_attempts = Set(0);
        active.blocked_until = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_password(&self, id: i32, new_hash: String) -> Result<()> {
        let user = admin_users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query admin for password update")?
            .ok_or_else(|| anyhow::anyhow!("Admin {id} not found"))?;

        let mut active: admin_users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.login_attempts = Set(0);
        active.blocked_until = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_profile(
        &self,
        id: i32,
        name: Option<String>,
        phone: Option<Option<String>>,
        role: Option<String>,
        active_flag: Option<bool>,
    ) -> Result<Option<AdminUser>> {
        let Some(user) = admin_users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut model: admin_users::ActiveModel = user.into();
        if let Some(name) = name {
            model.name = Set(name);
        }
        if let Some(phone) = phone {
            model.phone = Set(phone);
        }
        if let Some(role) = role {
            model.role = Set(role);
        }
        if let Some(active_flag) = active_flag {
            model.active = Set(active_flag);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&self.conn).await?;
        Ok(Some(AdminUser::from(updated)))
    }

    pub async fn set_active(&self, id: i32, active_flag: bool) -> Result<bool> {
        let Some(user) = admin_users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut model: admin_users::ActiveModel = user.into();
        model.active = Set(active_flag);
        model.updated_at = Set(Utc::now());
        model.update(&self.conn).await?;
        Ok(true)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> Result<(Vec<AdminUser>, u64)> {
        let mut query = admin_users::Entity::find();
        if let Some(term) = search {
            query = query.filter(
                admin_users::Column::Name
                    .contains(&term)
                    .or(admin_users::Column::Email.contains(&term)),
            );
        }

        let paginator = query
            .order_by_asc(admin_users::Column::Id)
            .paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows.into_iter().map(AdminUser::from).collect(), total))
    }
}

/// Hash a password using Argon2id with optional custom params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hash on a blocking task; Argon2 is CPU-intensive and would stall the
/// async runtime if run inline.
pub async fn hash_password_blocking(
    password: &str,
    config: Option<&SecurityConfig>,
) -> Result<String> {
    let password = password.to_string();
    let config = config.cloned();
    task::spawn_blocking(move || hash_password(&password, config.as_ref()))
        .await
        .context("Password hashing task panicked")?
}

/// Verify a password against a stored Argon2 hash on a blocking task.
pub async fn verify_password_hash(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generate a random opaque token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Generate a zero-padded 6-digit confirmation code.
#[must_use]
pub fn generate_code() -> String {
    use rand::Rng;

    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_64_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2hunter2", None).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"hunter2hunter2", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong-password", &parsed)
                .is_err()
        );
    }
}
