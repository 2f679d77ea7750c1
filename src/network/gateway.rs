//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds the listen socket and spawns a Connection task for
//! each incoming client.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, instrument, warn};

use crate::network::Connection;
use crate::state::Shared;
use crate::telemetry::spans;

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    shared: Arc<Shared>,
    next_id: u64,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(addr: SocketAddr, shared: Arc<Shared>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "listener bound");
        Ok(Self {
            listener,
            shared,
            next_id: 0,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%addr, error = %e, "could not set TCP_NODELAY");
                    }
                    self.next_id += 1;
                    let id = self.next_id;
                    let connection = Connection::new(id, stream, addr, self.shared.clone());
                    tokio::spawn(
                        async move {
                            if let Err(e) = connection.run().await {
                                warn!(error = %e, "connection ended with error");
                            }
                        }
                        .instrument(spans::connection(id, &addr.to_string())),
                    );
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}
