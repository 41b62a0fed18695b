//! `SeaORM` implementation of the `ConfirmationService` trait.

use async_trait::async_trait;
use chrono::Utc;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::admin_user::{generate_code, generate_token};
use crate::services::auth_service::{
    AuthError, ConfirmationKind, ConfirmationService, IssuedConfirmation,
};

pub struct SeaOrmConfirmationService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmConfirmationService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Register confirmations flip the account active on success; reset
    /// confirmations only prove ownership.
    fn activation_target<'a>(kind: ConfirmationKind, email: &'a str) -> Option<&'a str> {
        match kind {
            ConfirmationKind::Register => Some(email),
            ConfirmationKind::PasswordReset => None,
        }
    }
}

#[async_trait]
impl ConfirmationService for SeaOrmConfirmationService {
    async fn issue(
        &self,
        email: &str,
        kind: ConfirmationKind,
    ) -> Result<IssuedConfirmation, AuthError> {
        let row = self
            .store
            .confirmations()
            .issue(
                email,
                kind.as_str(),
                generate_code(),
                generate_token(),
                kind.ttl(&self.security),
            )
            .await?;

        Ok(IssuedConfirmation {
            code: row.code,
            token: row.token,
            expires_at: row.expires_at,
        })
    }

    async fn verify_code(
        &self,
        email: &str,
        kind: ConfirmationKind,
        code: &str,
    ) -> Result<(), AuthError> {
        let repo = self.store.confirmations();

        let Some(row) = repo.latest_active(email, kind.as_str()).await? else {
            return Err(AuthError::ExpiredCode);
        };

        if row.expires_at <= Utc::now() {
            return Err(AuthError::ExpiredCode);
        }

        // The budget check comes before the comparison, so a correct code
        // after too many wrong ones is still rejected.
        if row.attempts >= self.security.auth_throttle.max_code_attempts {
            return Err(AuthError::TooManyAttempts);
        }

        if row.code != code {
            repo.increment_attempts(row.id).await?;
            return Err(AuthError::WrongCode);
        }

        let completed = repo
            .complete(row.id, Self::activation_target(kind, email))
            .await?;
        if !completed {
            return Err(AuthError::ExpiredCode);
        }

        Ok(())
    }

    async fn verify_token(
        &self,
        token: &str,
        kind: ConfirmationKind,
    ) -> Result<String, AuthError> {
        let repo = self.store.confirmations();

        let Some(row) = repo.find_by_token(token, kind.as_str()).await? else {
            return Err(AuthError::ExpiredCode);
        };

        if row.expires_at <= Utc::now() {
            return Err(AuthError::ExpiredCode);
        }

        let completed = repo
            .complete(row.id, Self::activation_target(kind, &row.email))
            .await?;
        if !completed {
            return Err(AuthError::ExpiredCode);
        }

        Ok(row.email)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

    use super::*;
    use crate::db::NewAdminUser;

    async fn test_store() -> Store {
        // A single connection keeps every query on the same in-memory db.
        Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .expect("in-memory store")
    }

    fn service(store: &Store) -> SeaOrmConfirmationService {
        SeaOrmConfirmationService::new(store.clone(), SecurityConfig::default())
    }

    async fn seed_unverified_admin(store: &Store, email: &str) {
        store
            .admin_users()
            .create(
                NewAdminUser {
                    name: "Test Admin".to_string(),
                    email: email.to_string(),
                    phone: None,
                    role: "TECNICO".to_string(),
                    active: false,
                    email_verified: false,
                },
                "not-a-real-hash".to_string(),
            )
            .await
            .expect("seed admin");
    }

    fn wrong_code(code: &str) -> String {
        if code == "000000" {
            "000001".to_string()
        } else {
            "000000".to_string()
        }
    }

    #[tokio::test]
    async fn test_wrong_code_increments_until_locked() {
        let store = test_store().await;
        let svc = service(&store);
        let email = "locked@example.com";

        let issued = svc.issue(email, ConfirmationKind::Register).await.unwrap();
        let bad = wrong_code(&issued.code);

        for _ in 0..5 {
            let err = svc
                .verify_code(email, ConfirmationKind::Register, &bad)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::WrongCode));
        }

        // Budget spent: even the correct code is refused now.
        let err = svc
            .verify_code(email, ConfirmationKind::Register, &issued.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TooManyAttempts));
    }

    #[tokio::test]
    async fn test_resend_invalidates_previous_code() {
        let store = test_store().await;
        let svc = service(&store);
        let email = "resend@example.com";
        seed_unverified_admin(&store, email).await;

        let first = svc.issue(email, ConfirmationKind::Register).await.unwrap();
        let second = svc.issue(email, ConfirmationKind::Register).await.unwrap();
        assert_ne!(first.token, second.token);

        if first.code != second.code {
            let err = svc
                .verify_code(email, ConfirmationKind::Register, &first.code)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::WrongCode));
        }

        svc.verify_code(email, ConfirmationKind::Register, &second.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_activation_is_single_shot() {
        let store = test_store().await;
        let svc = service(&store);
        let email = "once@example.com";
        seed_unverified_admin(&store, email).await;

        let issued = svc.issue(email, ConfirmationKind::Register).await.unwrap();
        svc.verify_code(email, ConfirmationKind::Register, &issued.code)
            .await
            .unwrap();

        let admin = store
            .admin_users()
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.active);
        assert!(admin.email_verified);

        // The completed row no longer matches anything.
        let err = svc
            .verify_code(email, ConfirmationKind::Register, &issued.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredCode));
    }

    #[tokio::test]
    async fn test_verify_token_returns_email() {
        let store = test_store().await;
        let svc = service(&store);
        let email = "link@example.com";
        seed_unverified_admin(&store, email).await;

        let issued = svc.issue(email, ConfirmationKind::Register).await.unwrap();
        let confirmed = svc
            .verify_token(&issued.token, ConfirmationKind::Register)
            .await
            .unwrap();
        assert_eq!(confirmed, email);

        let err = svc
            .verify_token(&issued.token, ConfirmationKind::Register)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredCode));
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let store = test_store().await;
        let svc = service(&store);
        let email = "stale@example.com";

        svc.issue(email, ConfirmationKind::PasswordReset)
            .await
            .unwrap();

        let row = store
            .confirmations()
            .latest_active(email, ConfirmationKind::PasswordReset.as_str())
            .await
            .unwrap()
            .unwrap();
        let issued_code = row.code.clone();

        let mut stale = row.into_active_model();
        stale.expires_at = Set(Utc::now() - Duration::minutes(1));
        stale.update(&store.conn).await.unwrap();

        let err = svc
            .verify_code(email, ConfirmationKind::PasswordReset, &issued_code)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredCode));
    }
}
