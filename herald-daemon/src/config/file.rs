//! TOML file configuration structures.
//!
//! These structs directly map to the `herald-config.toml` file format.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    pub source: SourceConfig,
    pub discord: DiscordConfig,
}

/// Daemon configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between source polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

/// Event source configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the armory event API.
    pub base_url: Url,
}

/// Discord configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Base URL of the Discord REST API.
    #[serde(default = "default_api_base")]
    pub api_base: Url,
    /// Bot token. The `DISCORD_TOKEN` environment variable takes precedence.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_api_base() -> Url {
    "https://discord.com/api/v10"
        .parse()
        .expect("valid default API base")
}
