//! Registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RegistryError, Result};

/// Registry behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Name of the branch created with every new artifact
    pub default_branch: String,

    /// Upper bound for a single content upload
    pub upload_timeout: Duration,
}

impl RegistryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let default_branch = std::env::var("MODELHUB_DEFAULT_BRANCH")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "main".to_string());
        if default_branch.is_empty() {
            return Err(RegistryError::Config(
                "MODELHUB_DEFAULT_BRANCH must not be empty".to_string(),
            ));
        }

        let upload_timeout_seconds: u64 = std::env::var("MODELHUB_UPLOAD_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "300".to_string()) // 5 minutes default
            .parse()
            .map_err(|_| {
                RegistryError::Config("Invalid MODELHUB_UPLOAD_TIMEOUT_SECONDS value".to_string())
            })?;

        Ok(Self {
            default_branch,
            upload_timeout: Duration::from_secs(upload_timeout_seconds),
        })
    }

    pub fn with_default_branch(mut self, name: impl Into<String>) -> Self {
        self.default_branch = name.into();
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.upload_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_builders() {
        let config = RegistryConfig::default()
            .with_default_branch("trunk")
            .with_upload_timeout(Duration::from_secs(5));
        assert_eq!(config.default_branch, "trunk");
        assert_eq!(config.upload_timeout, Duration::from_secs(5));
    }
}
