//! Background job scheduler for Warden.
//!
//! # Available Jobs
//!
//! - **License Expiration**: sweeps `valid` licenses past `expires_at` and marks them
//!   `expired`, invalidating the status cache for every affected license key.
//!
//! # Usage
//!
//! ```rust,ignore
//! use warden::jobs::{JobScheduler, JobConfig};
//! use warden::server::Database;
//!
//! let db = Database::new().await?;
//! let status_cache = build_status_cache();
//! let config = JobConfig::default();
//! let scheduler = JobScheduler::new(db, status_cache, config).await?;
//! scheduler.start().await?;
//! ```

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
use tracing::{error, info};

use crate::server::cache::StatusCache;
use crate::server::database::Database;

mod license_expiration;

pub use license_expiration::run_license_expiration_check;

/// Configuration for background jobs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Cron expression for the license expiration sweep (default: every 30 seconds).
    pub license_expiration_cron: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            // Every 30 seconds, comfortably inside the required 60s ceiling.
            license_expiration_cron: "*/30 * * * * *".to_string(),
        }
    }
}

/// Background job scheduler for Warden.
pub struct JobScheduler {
    scheduler: TokioJobScheduler,
    db: Arc<Database>,
    status_cache: Arc<StatusCache>,
    config: JobConfig,
}

impl JobScheduler {
    pub async fn new(db: Arc<Database>, status_cache: Arc<StatusCache>, config: JobConfig) -> Result<Self, JobError> {
        let scheduler = TokioJobScheduler::new()
            .await
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        Ok(Self { scheduler, db, status_cache, config })
    }

    /// Start the job scheduler with all configured jobs.
    pub async fn start(&self) -> Result<(), JobError> {
        info!("starting warden job scheduler");

        self.add_license_expiration_job().await?;

        self.scheduler.start().await.map_err(|e| JobError::SchedulerError(e.to_string()))?;

        info!("warden job scheduler started");

        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobError> {
        info!("shutting down warden job scheduler");
        self.scheduler.shutdown().await.map_err(|e| JobError::SchedulerError(e.to_string()))?;
        Ok(())
    }

    async fn add_license_expiration_job(&self) -> Result<(), JobError> {
        let db = Arc::clone(&self.db);
        let status_cache = Arc::clone(&self.status_cache);

        let job = Job::new_async(self.config.license_expiration_cron.as_str(), move |_uuid, _l| {
            let db = Arc::clone(&db);
            let status_cache = Arc::clone(&status_cache);
            Box::pin(async move {
                match run_license_expiration_check(&db, &status_cache).await {
                    Ok(count) => {
                        if count > 0 {
                            info!(count, "license expiration sweep transitioned licenses");
                        }
                    }
                    Err(e) => error!(error = %e, "license expiration sweep failed"),
                }
            })
        })
        .map_err(|e| JobError::SchedulerError(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| JobError::SchedulerError(e.to_string()))?;

        info!(schedule = %self.config.license_expiration_cron, "added license expiration job");

        Ok(())
    }

    /// Run the license expiration check immediately (used by tests and manual triggers).
    pub async fn run_license_expiration_check_now(&self) -> Result<u64, JobError> {
        run_license_expiration_check(&self.db, &self.status_cache).await
    }
}

/// Errors that can occur in the job scheduler.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("scheduler error: {0}")]
    SchedulerError(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<crate::errors::LicenseError> for JobError {
    fn from(err: crate::errors::LicenseError) -> Self {
        JobError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_runs_well_under_the_sixty_second_ceiling() {
        let config = JobConfig::default();
        assert_eq!(config.license_expiration_cron, "*/30 * * * * *");
    }
}
