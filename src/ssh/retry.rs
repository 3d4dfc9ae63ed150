//! Connect retry within a single firing
//!
//! Provides optional retry with exponential backoff for transient connect
//! failures. With `max_retries == 0` (the default) exactly one attempt is made.

use std::time::Duration;
use tracing::{info, warn};

use super::client::Connector;
use super::error::SshError;
use crate::config::ConnectionParams;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,

    /// Initial backoff duration in seconds
    pub initial_backoff_secs: u64,

    /// Backoff multiplier for each retry
    pub backoff_multiplier: f64,

    /// Maximum backoff duration in seconds
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_secs: 1,
            backoff_multiplier: 2.0,
            max_backoff_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set custom backoff parameters
    pub fn with_backoff(mut self, initial_secs: u64, multiplier: f64, max_secs: u64) -> Self {
        self.initial_backoff_secs = initial_secs;
        self.backoff_multiplier = multiplier;
        self.max_backoff_secs = max_secs;
        self
    }
}

/// Calculate backoff delay for a given retry attempt (exponential backoff)
pub fn calculate_backoff(attempt: usize, config: &RetryConfig) -> Duration {
    let delay_secs = (config.initial_backoff_secs as f64
        * config.backoff_multiplier.powi(attempt as i32))
    .min(config.max_backoff_secs as f64);

    Duration::from_secs(delay_secs as u64)
}

/// Connect, retrying transient failures per `config`.
///
/// Non-transient errors (credentials, host key, subsystem) return at once.
pub async fn connect_with_retry<C: Connector>(
    connector: &C,
    params: &ConnectionParams,
    config: &RetryConfig,
) -> Result<C::Session, SshError> {
    let mut attempt = 0;
    loop {
        match connector.connect(params).await {
            Ok(session) => return Ok(session),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                let delay = calculate_backoff(attempt, config);
                warn!(
                    "Connect attempt {}/{} to {} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    config.max_retries + 1,
                    params.address(),
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    info!("Giving up on {} after {} attempts", params.address(), attempt + 1);
                }
                return Err(e);
            }
        }
    }
}
