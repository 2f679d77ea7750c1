//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "slbridge".to_string()
}

pub fn default_sid() -> String {
    "0SB".to_string()
}

pub fn default_version() -> String {
    format!("slircd-bridge-{}", env!("CARGO_PKG_VERSION"))
}

pub fn default_max_nick_len() -> usize {
    32
}

pub fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6667))
}
