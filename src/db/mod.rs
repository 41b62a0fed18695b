use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::admin_user::{AdminUser, NewAdminUser};
pub use repositories::farm::{NewFarm, UpdateFarm};
pub use repositories::indice::{NewIndice, UpdateIndice};
pub use repositories::provider::{NewProvider, UpdateProvider};
pub use repositories::region::{NewRegion, UpdateRegion};
pub use repositories::threshold::{NewThreshold, UpdateThreshold};
pub use repositories::usuario::{NewUsuario, UpdateUsuario};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // File-backed SQLite needs the file to exist up front; Postgres
        // URLs skip this entirely.
        if db_url.starts_with("sqlite:") && !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn admin_users(&self) -> repositories::admin_user::AdminUserRepository {
        repositories::admin_user::AdminUserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn confirmations(&self) -> repositories::confirmation::ConfirmationRepository {
        repositories::confirmation::ConfirmationRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn sessions(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn farms(&self) -> repositories::farm::FarmRepository {
        repositories::farm::FarmRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn usuarios(&self) -> repositories::usuario::UsuarioRepository {
        repositories::usuario::UsuarioRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn providers(&self) -> repositories::provider::ProviderRepository {
        repositories::provider::ProviderRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn indices(&self) -> repositories::indice::IndiceRepository {
        repositories::indice::IndiceRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn thresholds(&self) -> repositories::threshold::ThresholdRepository {
        repositories::threshold::ThresholdRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn regions(&self) -> repositories::region::RegionRepository {
        repositories::region::RegionRepository::new(self.conn.clone())
    }
}
