use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::MaintenanceConfig;
use crate::state::SharedState;

/// Background job that expires stale auth state: completed or long-expired
/// pending confirmations are deleted and expired sessions are flipped
/// inactive.
pub struct MaintenanceScheduler {
    shared: Arc<SharedState>,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    #[must_use]
    pub const fn new(shared: Arc<SharedState>, config: MaintenanceConfig) -> Self {
        Self { shared, config }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Maintenance scheduler is disabled in config");
            return Ok(());
        }

        let mut sched = JobScheduler::new().await?;

        let shared = Arc::clone(&self.shared);
        let retention_days = self.config.confirmation_retention_days;

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_uuid, _lock| {
            let shared = Arc::clone(&shared);
            Box::pin(async move {
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "prune_auth_state", "Starting auth maintenance");

                match shared.store.confirmations().prune(retention_days).await {
                    Ok(n) if n > 0 => info!(pruned = n, "Pruned stale confirmations"),
                    Ok(_) => {}
                    Err(e) => {
                        error!(event = "job_failed", job_name = "prune_auth_state", error = %e, "Confirmation pruning failed");
                    }
                }

                match shared.store.sessions().prune_expired().await {
                    Ok(n) if n > 0 => info!(expired = n, "Deactivated expired sessions"),
                    Ok(_) => {}
                    Err(e) => {
                        error!(event = "job_failed", job_name = "prune_auth_state", error = %e, "Session pruning failed");
                    }
                }

                info!(
                    event = "job_finished",
                    job_name = "prune_auth_state",
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Auth maintenance finished"
                );
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            "Maintenance scheduler running with cron: {}",
            self.config.cron_expression
        );

        // Keep the scheduler alive for the life of the daemon.
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }
}
