use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

use crate::entities::{admin_sessions, admin_users, pending_confirmations};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Hash the seed password using Argon2id
fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let password = b"password";
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password, &salt)
        .expect("Failed to hash default password")
        .to_string()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(admin_users::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(pending_confirmations::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(admin_sessions::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the bootstrap SUPER_ADMIN so a fresh install can log in
        let now = chrono::Utc::now();
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(admin_users::Entity)
            .columns([
                admin_users::Column::Name,
                admin_users::Column::Email,
                admin_users::Column::PasswordHash,
                admin_users::Column::Role,
                admin_users::Column::Active,
                admin_users::Column::EmailVerified,
                admin_users::Column::LoginAttempts,
                admin_users::Column::CreatedAt,
                admin_users::Column::UpdatedAt,
            ])
            .values_panic([
                "Administrador".into(),
                "admin@telegan.local".into(),
                password_hash.into(),
                crate::constants::roles::SUPER_ADMIN.into(),
                true.into(),
                true.into(),
                0.into(),
                now.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(admin_sessions::Entity).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(pending_confirmations::Entity)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(admin_users::Entity).to_owned())
            .await?;

        Ok(())
    }
}
