//! sftpcron - scheduled SFTP fetcher
//!
//! Pulls a fixed list of files from one SSH host on a cron schedule and
//! writes them into a local directory.

pub mod config;
pub mod job;
pub mod scheduler;
pub mod sftp;
pub mod ssh;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{ConfigError, ConfigStorage};
use job::DownloadJob;
use scheduler::{Schedule, ScheduleError, Scheduler};
use ssh::SshConnector;

/// Errors that stop the process
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("scheduler task ended unexpectedly: {0}")]
    Scheduler(String),
}

/// Initialize logging. Status lines go to stdout; `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration from the default location and run.
pub async fn run() -> Result<(), AppError> {
    run_with(ConfigStorage::new()).await
}

/// Load configuration from `storage`, parse the schedule and fire downloads
/// until the process is terminated.
///
/// Returns only on a startup failure or if the schedule runs dry. Startup
/// failures are reported before the first firing is scheduled.
pub async fn run_with(storage: ConfigStorage) -> Result<(), AppError> {
    let config = Arc::new(storage.load().await?);
    let schedule = Schedule::parse(&config.connection.schedule)?;

    info!(
        "Scheduling {} file(s) from {} with '{}'",
        config.connection.remote_files.len(),
        config.connection.address(),
        schedule.expression()
    );

    let job = Arc::new(DownloadJob::new(config, SshConnector));
    let handle = Scheduler::new(schedule).start(move || {
        let job = job.clone();
        async move {
            job.run_once().await;
        }
    });

    handle
        .await
        .map_err(|e| AppError::Scheduler(e.to_string()))
}
