pub mod tasks;

use anyhow::{Context, Result};
use tokio_cron_scheduler::JobScheduler;
use tracing::info;

use crate::config::GeneralConfig;

/// The heartbeat job, running on its own tokio-cron-scheduler
pub struct Heartbeat {
    inner: JobScheduler,
}

impl Heartbeat {
    /// Schedule the heartbeat on `general.heartbeat_cron` and start ticking
    pub async fn start(general: &GeneralConfig) -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;

        let job = tasks::heartbeat_job(&general.heartbeat_cron, general.readiness_file.clone())?;
        inner
            .add(job)
            .await
            .context("Failed to add the heartbeat job")?;
        inner
            .start()
            .await
            .context("Failed to start scheduler")?;

        info!("Heartbeat scheduled with cron: {}", general.heartbeat_cron);
        Ok(Self { inner })
    }

    pub async fn stop(mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Heartbeat stopped");
        Ok(())
    }
}
