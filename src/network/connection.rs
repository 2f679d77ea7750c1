//! Connection - Handles an individual client connection.
//!
//! ```text
//!  socket ──▶ reader task ──▶ inbound queue ──▶ Server::connect / Server::handle
//!                                                        │
//!  socket ◀── writer task ◀── outbound queue ◀───────────┘ (and relay tasks)
//! ```
//!
//! Each connection gets its own [`Server`]. The writer ends once every
//! sender of the outbound queue is gone, which flushes the closing ERROR.

use futures_util::StreamExt;
use irc_proto::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::state::{OUTBOUND_QUEUE, Server, Shared};

/// Longest line accepted from a client, tags included.
const MAX_LINE_LEN: usize = 8192;

/// Parsed client messages awaiting dispatch.
const INBOUND_QUEUE: usize = 64;

/// A client connection handler.
pub struct Connection {
    id: u64,
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Connection {
    pub fn new(id: u64, stream: TcpStream, addr: SocketAddr, shared: Arc<Shared>) -> Self {
        Self {
            id,
            stream,
            addr,
            shared,
        }
    }

    /// Run the connection until the client leaves.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            id,
            stream,
            addr,
            shared,
        } = self;
        info!(conn_id = id, %addr, "connection accepted");

        let (read_half, write_half) = tokio::io::split(stream);
        let (in_tx, mut in_rx) = mpsc::channel::<Message>(INBOUND_QUEUE);
        let (out_tx, out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);

        let reader = tokio::spawn(async move {
            let mut lines =
                FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_LEN));
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(LinesCodecError::MaxLineLengthExceeded) => {
                        debug!("oversized line discarded");
                        continue;
                    }
                    Err(LinesCodecError::Io(e)) => {
                        debug!(error = %e, "read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Message>() {
                    Ok(msg) => {
                        if in_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!(error = %e, line = %line, "unparsable line skipped"),
                }
            }
        });
        let writer = tokio::spawn(write_loop(write_half, out_rx));

        let server = Server::new(shared);
        let user = server.new_local_user(addr.ip().to_string(), out_tx);

        let outcome = match server.connect(&user, &mut in_rx).await {
            Ok(()) => {
                server.handle(&user, in_rx).await;
                Ok(())
            }
            Err(e) => {
                warn!(conn_id = id, %addr, error = %e, "registration failed");
                Err(e.into())
            }
        };

        drop(user);
        reader.abort();
        if let Err(e) = writer.await {
            debug!(error = %e, "writer task ended abnormally");
        }
        info!(conn_id = id, %addr, "connection closed");
        outcome
    }
}

async fn write_loop(mut sink: WriteHalf<TcpStream>, mut outbound: mpsc::Receiver<Message>) {
    while let Some(msg) = outbound.recv().await {
        let mut line = msg.to_string();
        if !line.ends_with("\r\n") {
            line.push_str("\r\n");
        }
        if let Err(e) = sink.write_all(line.as_bytes()).await {
            debug!(error = %e, "write failed");
            return;
        }
    }
    let _ = sink.shutdown().await;
}
