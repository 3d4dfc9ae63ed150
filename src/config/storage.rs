//! Configuration Storage
//!
//! Reads the YAML configuration document from disk.
//! Default location: `./config.yaml`, overridable via `SFTPCRON_CONFIG`.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::ConfigError;
use super::types::AppConfig;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Environment variable overriding the configuration path
pub const CONFIG_PATH_ENV: &str = "SFTPCRON_CONFIG";

/// Resolve the configuration path from the environment
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Configuration storage manager
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Create a storage manager for the path resolved from the environment
    pub fn new() -> Self {
        Self {
            path: config_path(),
        }
    }

    /// Create storage manager with custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load and validate the configuration.
    ///
    /// A missing file is an error: there are no usable defaults for the
    /// remote host or credentials.
    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        let contents =
            fs::read_to_string(&self.path)
                .await
                .map_err(|source| ConfigError::FileReadError {
                    path: self.path.clone(),
                    source,
                })?;

        let config: AppConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::YamlFileError {
                path: self.path.clone(),
                source,
            })?;
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}: {:?}", self.path, config);
        Ok(config)
    }

    /// Get config file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ConfigStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and validate a configuration document held in memory
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}
