//! Configuration types
//!
//! The on-disk document has a required `connection` section and an optional
//! `transfer` section. Field names follow the YAML keys (camelCase); the
//! recurrence expression lives under the short key `c`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::ssh::HostKeyPolicy;

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote endpoint, credentials, file list and schedule
    pub connection: ConnectionParams,

    /// Local output and run policies
    #[serde(default)]
    pub transfer: TransferSettings,
}

impl AppConfig {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()
    }
}

/// Connection parameters for the single remote host
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    /// Username for authentication
    pub user: String,

    /// Password-equivalent credential
    #[serde(rename = "password")]
    pub secret: String,

    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote paths to fetch, in order. Duplicates are allowed.
    #[serde(default)]
    pub remote_files: Vec<String>,

    /// Six-field recurrence expression (seconds first)
    #[serde(rename = "c")]
    pub schedule: String,

    /// TCP dial timeout in seconds
    #[serde(default = "default_timeout", rename = "timeoutSecs")]
    pub connect_timeout_secs: u64,

    /// Pinned host key fingerprint (`SHA256:...`). Absent means any host key
    /// is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_key: Option<String>,

    /// Connect attempts after the first one, per firing
    #[serde(default, rename = "retries")]
    pub connect_retries: usize,
}

impl ConnectionParams {
    /// Build parameters with defaults for everything but the essentials.
    pub fn new(
        user: impl Into<String>,
        secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
            host: host.into(),
            port,
            remote_files: Vec::new(),
            schedule: "0 * * * * *".to_string(),
            connect_timeout_secs: default_timeout(),
            host_key: None,
            connect_retries: 0,
        }
    }

    pub fn with_remote_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// `host:port` string used for dialing and log lines
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn host_key_policy(&self) -> HostKeyPolicy {
        match &self.host_key {
            Some(fingerprint) => HostKeyPolicy::Pinned(fingerprint.clone()),
            None => HostKeyPolicy::AcceptAny,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("connection.host".to_string()));
        }
        if self.user.is_empty() {
            return Err(ConfigError::MissingField("connection.user".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.port must be between 1 and 65535".to_string(),
            ));
        }
        if self.schedule.trim().is_empty() {
            return Err(ConfigError::MissingField("connection.c".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.timeoutSecs must be at least 1".to_string(),
            ));
        }
        if let Some(fingerprint) = &self.host_key {
            if !fingerprint.starts_with("SHA256:") {
                return Err(ConfigError::InvalidConfig(format!(
                    "connection.hostKey must be a SHA256 fingerprint, got '{}'",
                    fingerprint
                )));
            }
        }
        Ok(())
    }
}

// The secret never reaches log output.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("remote_files", &self.remote_files)
            .field("schedule", &self.schedule)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("host_key", &self.host_key)
            .field("connect_retries", &self.connect_retries)
            .finish()
    }
}

/// What a run does after a file fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Halt at the first failed file; later files get no outcome
    #[default]
    Stop,
    /// Attempt every file and record one outcome each
    Continue,
}

/// What a firing does while the previous run is still in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Start a new run regardless; runs may overlap
    #[default]
    Allow,
    /// Skip the firing
    Skip,
}

/// Local output and run policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSettings {
    /// Directory downloaded files are written into
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            on_failure: FailurePolicy::default(),
            overlap: OverlapPolicy::default(),
        }
    }
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    10
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("./")
}
