//! Domain services for authentication and email-confirmation proof.
//!
//! Handles registration, two-step login, session validation, and the
//! PIN/token confirmation machinery shared by registration and password
//! reset.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::db::NewAdminUser;
use crate::entities::admin_users;

/// Errors specific to authentication and confirmation operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account temporarily blocked")]
    AccountBlocked,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Confirmation code expired or not found")]
    ExpiredCode,

    #[error("Too many incorrect attempts")]
    TooManyAttempts,

    #[error("Incorrect confirmation code")]
    WrongCode,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Admin info DTO for responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AdminInfo {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
}

impl From<admin_users::Model> for AdminInfo {
    fn from(model: admin_users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            active: model.active,
            email_verified: model.email_verified,
        }
    }
}

/// Input for self-service registration.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

/// Outcome of a credentials-step login.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials and email verification both passed; a session exists.
    Verified {
        token: String,
        expires_at: DateTime<Utc>,
        admin: AdminInfo,
    },
    /// Credentials passed but the email is unverified; the client must
    /// complete the PIN step. No session is created.
    PinRequired { email: String },
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an unverified, inactive admin account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateEmail`] when the address is taken and
    /// [`AuthError::Validation`] for short passwords.
    async fn register(&self, input: RegisterInput) -> Result<AdminInfo, AuthError>;

    /// Verifies credentials and either opens a session or demands the
    /// confirmation PIN.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountBlocked`] while the lockout window is
    /// open, even for a correct password.
    async fn login(
        &self,
        email: &str,
        password: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<LoginOutcome, AuthError>;

    /// Creates an active, pre-verified admin (operator-initiated).
    async fn create_admin(
        &self,
        input: NewAdminUser,
        password: &str,
    ) -> Result<AdminInfo, AuthError>;

    /// Replaces the password and clears any login throttle. Authorization
    /// must already be established by the caller.
    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AuthError>;

    /// Resolves a session token to its admin, if still valid.
    async fn validate_session(&self, token: &str) -> Result<Option<AdminInfo>, AuthError>;

    /// Invalidates a session token. Returns false for unknown tokens.
    async fn logout(&self, token: &str) -> Result<bool, AuthError>;
}

/// The two proof flows backed by `pending_confirmations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Register,
    PasswordReset,
}

impl ConfirmationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::PasswordReset => "RESET_PASSWORD",
        }
    }

    #[must_use]
    pub fn ttl(self, security: &SecurityConfig) -> Duration {
        match self {
            Self::Register => Duration::hours(security.register_code_ttl_hours),
            Self::PasswordReset => Duration::minutes(security.reset_code_ttl_minutes),
        }
    }
}

/// A freshly issued confirmation, ready to be emailed.
#[derive(Debug, Clone)]
pub struct IssuedConfirmation {
    pub code: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain service trait for email-ownership proof.
#[async_trait::async_trait]
pub trait ConfirmationService: Send + Sync {
    /// Issues (or re-issues, invalidating the previous code) a pending
    /// confirmation for the address.
    async fn issue(
        &self,
        email: &str,
        kind: ConfirmationKind,
    ) -> Result<IssuedConfirmation, AuthError>;

    /// Checks a PIN code against the active pending confirmation.
    ///
    /// # Errors
    ///
    /// [`AuthError::ExpiredCode`] when nothing active exists,
    /// [`AuthError::TooManyAttempts`] once the attempt budget is spent
    /// (correct codes included), [`AuthError::WrongCode`] on mismatch.
    async fn verify_code(
        &self,
        email: &str,
        kind: ConfirmationKind,
        code: &str,
    ) -> Result<(), AuthError>;

    /// Link-based variant; returns the confirmed email on success.
    async fn verify_token(&self, token: &str, kind: ConfirmationKind)
    -> Result<String, AuthError>;
}
