//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::bridge::{GhostCacheConfig, MattermostConfig, SlackConfig};
use super::defaults::{
    default_listen_address, default_max_nick_len, default_server_name, default_sid,
    default_true, default_version,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity presented to IRC clients.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Slack backend settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Mattermost backend settings.
    #[serde(default)]
    pub mattermost: MattermostConfig,
    /// Ghost identity cache policy.
    #[serde(default)]
    pub ghosts: GhostCacheConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name used as the prefix of numerics (e.g., "slbridge").
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prefix for locally generated user ids (3 characters).
    #[serde(default = "default_sid")]
    pub sid: String,
    /// Version string reported in RPL_YOURHOST / RPL_MYINFO.
    #[serde(default = "default_version")]
    pub version: String,
    /// Maximum nickname length; longer nicks are truncated.
    #[serde(default = "default_max_nick_len")]
    pub max_nick_len: usize,
    /// Unlink channels whose membership drops to zero.
    #[serde(default = "default_true")]
    pub discard_empty: bool,
    /// Message of the Day lines.
    #[serde(default)]
    pub motd: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            sid: default_sid(),
            version: default_version(),
            max_nick_len: default_max_nick_len(),
            discard_empty: true,
            motd: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Plaintext IRC listen address.
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
        }
    }
}
