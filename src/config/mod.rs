//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ListenConfig)
//! - [`bridge`]: Backend configuration (SlackConfig, MattermostConfig, GhostCacheConfig)
//! - [`defaults`]: Serde default value functions

mod bridge;
mod defaults;
mod types;

pub use bridge::{MattermostConfig, SlackConfig};
pub use types::Config;
