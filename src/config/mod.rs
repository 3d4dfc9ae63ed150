//! Configuration Management Module
//!
//! Loads the YAML document describing the remote host, the file list, the
//! schedule and the local run policies. The result is an immutable
//! [`AppConfig`] built once at startup and shared by reference.

pub mod error;
pub mod storage;
pub mod types;

pub use error::ConfigError;
pub use storage::{config_path, parse_config, ConfigStorage, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
pub use types::{AppConfig, ConnectionParams, FailurePolicy, OverlapPolicy, TransferSettings};
