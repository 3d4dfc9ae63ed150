//! Download job: one scheduled run, end to end
//!
//! connect -> transfer every listed file (or stop early) -> disconnect.
//! The session is closed on every path once acquired; if the run unwinds,
//! the session's `Drop` disconnects instead.

use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, OverlapPolicy};
use crate::scheduler::OverlapGuard;
use crate::sftp::{RemoteSession, RunResult, TransferEngine};
use crate::ssh::{connect_with_retry, Connector, RetryConfig};

/// Everything one firing needs, shared by all firings
pub struct DownloadJob<C: Connector> {
    config: Arc<AppConfig>,
    connector: C,
    engine: TransferEngine,
    retry: RetryConfig,
    guard: OverlapGuard,
}

impl<C: Connector> DownloadJob<C> {
    pub fn new(config: Arc<AppConfig>, connector: C) -> Self {
        let engine = TransferEngine::new(config.transfer.local_dir.clone())
            .with_failure_policy(config.transfer.on_failure);
        let retry = RetryConfig::new(config.connection.connect_retries);

        Self {
            config,
            connector,
            engine,
            retry,
            guard: OverlapGuard::new(),
        }
    }

    /// Override the backoff used between connect attempts.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Execute one run.
    pub async fn run_once(&self) -> RunResult {
        let run_id = Uuid::new_v4();
        self.run_guarded()
            .instrument(info_span!("run", id = %run_id))
            .await
    }

    async fn run_guarded(&self) -> RunResult {
        let _permit = match self.config.transfer.overlap {
            OverlapPolicy::Allow => None,
            OverlapPolicy::Skip => match self.guard.try_acquire() {
                Some(permit) => Some(permit),
                None => {
                    warn!("Previous run still in flight, skipping this firing");
                    return RunResult::Skipped;
                }
            },
        };

        info!("Start download at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        let params = &self.config.connection;
        if params.remote_files.is_empty() {
            info!("No remote files configured, nothing to fetch");
            return RunResult::Completed(Vec::new());
        }

        let mut session = match connect_with_retry(&self.connector, params, &self.retry).await {
            Ok(session) => session,
            Err(e) => {
                error!("Connection to {} failed: {}", params.address(), e);
                return RunResult::ConnectionFailed(e);
            }
        };

        let outcomes = self.engine.run(&session, &params.remote_files).await;
        session.close().await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded == params.remote_files.len() {
            info!("Run finished: {} file(s) downloaded", succeeded);
        } else {
            warn!(
                "Run finished: {}/{} file(s) downloaded, {} attempted",
                succeeded,
                params.remote_files.len(),
                outcomes.len()
            );
        }

        RunResult::Completed(outcomes)
    }
}
