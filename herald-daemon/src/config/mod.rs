//! Configuration module for herald-daemon.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.

pub mod file;

use crate::config::file::{DaemonConfig, DiscordConfig, FileConfig, SourceConfig};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,

    #[error("no Discord token in DISCORD_TOKEN or the config file")]
    MissingDiscordToken,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub daemon: DaemonConfig,
    pub source: SourceConfig,
    pub discord: DiscordConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Validate the configuration
    /// 3. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;

        self.validate(&file_config)?;

        Ok(LoadedConfig {
            daemon: file_config.daemon,
            source: file_config.source,
            discord: file_config.discord,
        })
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.daemon.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "daemon.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        for (name, url) in [
            ("source.base_url", &config.source.base_url),
            ("discord.api_base", &config.discord.api_base),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

/// Get the Discord bot token, preferring the environment over the config
/// file.
pub fn get_discord_token(file_token: Option<&str>) -> Result<String, ConfigError> {
    if let Ok(token) = std::env::var("DISCORD_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    file_token
        .map(str::to_owned)
        .ok_or(ConfigError::MissingDiscordToken)
}
