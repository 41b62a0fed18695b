//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Utc;

use crate::config::SecurityConfig;
use crate::constants::{auth, roles};
use crate::db::repositories::admin_user::{
    generate_token, hash_password_blocking, verify_password_hash,
};
use crate::db::{NewAdminUser, Store};
use crate::services::auth_service::{
    AdminInfo, AuthError, AuthService, LoginOutcome, RegisterInput,
};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    session_ttl_minutes: i64,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig, session_ttl_minutes: i64) -> Self {
        Self {
            store,
            security,
            session_ttl_minutes,
        }
    }

    fn check_password_length(password: &str) -> Result<(), AuthError> {
        if password.len() < auth::MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                auth::MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: RegisterInput) -> Result<AdminInfo, AuthError> {
        Self::check_password_length(&input.password)?;

        if self.store.admin_users().email_exists(&input.email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password_blocking(&input.password, Some(&self.security)).await?;

        // Accounts start dormant; the confirmation step activates them.
        let user = self
            .store
            .admin_users()
            .create(
                NewAdminUser {
                    name: input.name,
                    email: input.email,
                    phone: input.phone,
                    role: roles::TECNICO.to_string(),
                    active: false,
                    email_verified: false,
                },
                hash,
            )
            .await?;

        Ok(AdminInfo::from(user))
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.store.admin_users().get_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        // An open lockout window rejects everything, correct password
        // included.
        if let Some(blocked_until) = user.blocked_until
            && blocked_until > Utc::now()
        {
            return Err(AuthError::AccountBlocked);
        }

        let password_ok = verify_password_hash(password, &user.password_hash).await?;
        if !password_ok {
            let throttle = &self.security.auth_throttle;
            let (_, blocked) = self
                .store
                .admin_users()
                .record_failed_login(user.id, throttle.max_attempts, throttle.lockout_minutes)
                .await?;

            return Err(if blocked {
                AuthError::AccountBlocked
            } else {
                AuthError::InvalidCredentials
            });
        }

        if !user.email_verified {
            return Ok(LoginOutcome::PinRequired { email: user.email });
        }

        if !user.active {
            return Err(AuthError::AccountInactive);
        }

        self.store.admin_users().clear_login_throttle(user.id).await?;

        let token = generate_token();
        let session = self
            .store
            .sessions()
            .create(
                user.id,
                token.clone(),
                ip.to_string(),
                user_agent.to_string(),
                self.session_ttl_minutes,
            )
            .await?;

        Ok(LoginOutcome::Verified {
            token,
            expires_at: session.expires_at,
            admin: AdminInfo::from(user),
        })
    }

    async fn create_admin(
        &self,
        input: NewAdminUser,
        password: &str,
    ) -> Result<AdminInfo, AuthError> {
        if !roles::is_valid(&input.role) {
            return Err(AuthError::Validation(format!(
                "Unknown role: {}",
                input.role
            )));
        }
        Self::check_password_length(password)?;

        if self.store.admin_users().email_exists(&input.email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password_blocking(password, Some(&self.security)).await?;
        let user = self.store.admin_users().create(input, hash).await?;

        Ok(AdminInfo::from(user))
    }

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AuthError> {
        Self::check_password_length(new_password)?;

        let user = self
            .store
            .admin_users()
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let hash = hash_password_blocking(new_password, Some(&self.security)).await?;
        self.store.admin_users().set_password(user.id, hash).await?;

        Ok(())
    }

    async fn validate_session(&self, token: &str) -> Result<Option<AdminInfo>, AuthError> {
        let admin = self.store.sessions().validate(token).await?;
        Ok(admin.map(AdminInfo::from))
    }

    async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.store.sessions().deactivate(token).await?)
    }
}
