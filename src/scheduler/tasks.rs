use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use tokio_cron_scheduler::Job;
use tracing::{info, warn};

/// Log that the bot is alive and refresh the readiness marker with the time of the beat
pub fn heartbeat_job(cron_expr: &str, readiness_file: PathBuf) -> Result<Job> {
    let started = Instant::now();

    Job::new_async(cron_expr, move |_uuid, _lock| {
        let readiness_file = readiness_file.clone();
        Box::pin(async move {
            info!(
                "Heartbeat: bot is alive, up for {}s",
                started.elapsed().as_secs()
            );
            if let Err(e) = write_marker(&readiness_file).await {
                warn!("Failed to refresh {}: {:#}", readiness_file.display(), e);
            }
        })
    })
    .with_context(|| format!("Invalid heartbeat schedule '{}'", cron_expr))
}

/// Write the readiness marker; its content is the local time it was written
pub async fn write_marker(path: &Path) -> Result<()> {
    tokio::fs::write(path, Local::now().to_rfc3339()).await?;
    Ok(())
}
