use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::clients::WhatsAppClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{EmailSender, build_mailer};

/// Long-lived resources shared by the API, the CLI paths, and the
/// maintenance scheduler.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub mailer: Arc<dyn EmailSender>,

    pub whatsapp: Option<Arc<WhatsAppClient>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let mailer = build_mailer(&config.email)?;

        // A broken gateway config downgrades to "no alerts" instead of
        // refusing to start.
        let whatsapp = if config.whatsapp.enabled {
            match WhatsAppClient::new(&config.whatsapp) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("WhatsApp alerts disabled: {e:#}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            mailer,
            whatsapp,
        })
    }
}
