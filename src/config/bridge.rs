//! Backend bridge configuration.

use serde::Deserialize;

/// Slack login policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    /// Team domains a login may connect to. Empty allows any team.
    #[serde(default)]
    pub restrict: Vec<String>,
    /// Slack user names that may not log in through this bridge.
    #[serde(default)]
    pub deny_users: Vec<String>,
    /// Use the profile display name as IRC nick when it is a valid nick.
    #[serde(default)]
    pub prefer_nickname: bool,
}

/// Mattermost defaults used when PASS/LOGIN omits server or team.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MattermostConfig {
    /// Default server host (e.g., "chat.example.com").
    #[serde(default)]
    pub default_server: String,
    /// Default team name.
    #[serde(default)]
    pub default_team: String,
    /// Use http/ws instead of https/wss.
    #[serde(default)]
    pub insecure: bool,
}

/// Ghost identity cache policy.
///
/// `max_entries = 0` keeps every identity for the process lifetime; otherwise
/// the oldest inserted identity is evicted once the cache is full.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GhostCacheConfig {
    #[serde(default)]
    pub max_entries: usize,
}
