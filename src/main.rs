//! slbridged - Straylight IRC Bridge
//!
//! Presents a Slack or Mattermost account as an IRC server. Every client
//! connection gets its own server view; PASS selects and logs in to the
//! backend.

mod bridge;
mod config;
mod error;
mod handlers;
mod network;
mod relay;
mod state;
mod telemetry;

use crate::bridge::NetworkConnector;
use crate::config::Config;
use crate::network::Gateway;
use crate::state::Shared;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.name,
        version = %config.server.version,
        address = %config.listen.address,
        "Starting slbridged"
    );

    let connector = Arc::new(NetworkConnector::new(
        config.slack.clone(),
        config.mattermost.clone(),
    ));
    let address = config.listen.address;
    let shared = Shared::new(config, connector);

    let gateway = Gateway::bind(address, shared).await?;
    info!(address = %gateway.local_addr()?, "Accepting IRC clients");

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    Ok(())
}
