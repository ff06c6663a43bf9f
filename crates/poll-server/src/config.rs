//! Configuration management

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Serve both bindings from one store instead of one store per binding.
    pub shared_store: bool,

    pub cors_enabled: bool,

    // Graceful shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            shared_store: false,
            cors_enabled: true,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("POLL_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid bind_addr: {}", e)))?;
        }

        if let Ok(shared) = std::env::var("POLL_SHARED_STORE") {
            config.shared_store = parse_flag("POLL_SHARED_STORE", &shared)?;
        }

        if let Ok(cors) = std::env::var("POLL_CORS_ENABLED") {
            config.cors_enabled = parse_flag("POLL_CORS_ENABLED", &cors)?;
        }

        if let Ok(secs) = std::env::var("POLL_SHUTDOWN_TIMEOUT_SECS") {
            config.shutdown_timeout_secs = secs
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid shutdown_timeout_secs: {}", e)))?;
        }

        Ok(config)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the TOML file named by `POLL_CONFIG_PATH`, else from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var("POLL_CONFIG_PATH") {
            Ok(path) => Self::from_toml(path)?,
            Err(_) => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "shutdown_timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!("{} must be a boolean, got {:?}", key, other))),
    }
}
