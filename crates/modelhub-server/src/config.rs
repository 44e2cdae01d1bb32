//! Server configuration management

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Maximum request body size; registration bodies carry base64 content
    pub max_upload_bytes: usize,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,

    /// Serve an in-process "MEMORY" source next to R2/S3
    pub enable_memory_source: bool,

    /// Whether to enable debug logging
    pub debug: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid PORT value".to_string()))?,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (512 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid MAX_UPLOAD_BYTES value".to_string()))?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            enable_memory_source: flag("ENABLE_MEMORY_SOURCE"),
            debug: flag("DEBUG"),
        })
    }

    /// Default tracing filter when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "modelhub_server=debug,modelhub_registry=debug,tower_http=debug"
        } else {
            "modelhub_server=info,modelhub_registry=info,tower_http=info"
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn flag(name: &str) -> bool {
    std::env::var(name)
        .map(|s| s.to_lowercase() == "true")
        .unwrap_or(false)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 512 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            enable_memory_source: false,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_origin_policy() {
        let mut config = ServerConfig::default();
        assert!(config.allows_any_origin());

        config.cors_origins = vec!["https://hub.example.com".to_string()];
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_log_filter_follows_debug_flag() {
        let mut config = ServerConfig::default();
        assert!(config.default_log_filter().contains("modelhub_server=info"));
        config.debug = true;
        assert!(config.default_log_filter().contains("modelhub_registry=debug"));
    }
}
