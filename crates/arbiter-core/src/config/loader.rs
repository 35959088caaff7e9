//! Configuration loader for YAML files
//!
//! Loads the worker configuration from a YAML file or string and runs the
//! validation pass before handing it to the caller.

use crate::config::types::ArbiterConfig;
use crate::errors::JudgeError;
use std::path::Path;
use tokio::fs;

/// Loader for the worker configuration
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<ArbiterConfig, JudgeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            JudgeError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<ArbiterConfig, JudgeError> {
        let config: ArbiterConfig = serde_yaml::from_str(content)
            .map_err(|e| JudgeError::ConfigError(format!("Failed to parse YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}
