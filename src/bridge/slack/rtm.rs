//! Slack RTM websocket reader.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::api::SlackEvent;
use crate::error::BridgeError;

pub type RtmStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn open(url: &str) -> Result<RtmStream, BridgeError> {
    let (ws, _response) = connect_async(url).await?;
    debug!("slack rtm connected");
    Ok(ws)
}

/// Forward parsed RTM frames until the socket closes or the receiver goes
/// away. Always ends with [`SlackEvent::Disconnected`].
pub async fn read_loop(
    ws: RtmStream,
    events: mpsc::Sender<SlackEvent>,
    connected: Arc<AtomicBool>,
) {
    let (mut tx, mut rx) = ws.split();

    while let Some(frame) = rx.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(payload)) => {
                if tx.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "slack rtm closed by server");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "slack rtm read failed");
                break;
            }
        };

        let event = match serde_json::from_str::<SlackEvent>(&text) {
            Ok(SlackEvent::Unknown) => continue,
            Ok(event) => event,
            Err(e) => {
                trace!(error = %e, frame = %text, "unparsed slack rtm frame");
                continue;
            }
        };
        if events.send(event).await.is_err() {
            break;
        }
    }

    connected.store(false, Ordering::SeqCst);
    info!("slack rtm stream ended");
    let _ = events.send(SlackEvent::Disconnected).await;
}
