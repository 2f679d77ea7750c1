//! Mattermost websocket reader.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::api::{AuthChallenge, WsEvent};
use crate::error::BridgeError;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect and answer the authentication challenge.
pub async fn open(url: &str, token: &str) -> Result<WsStream, BridgeError> {
    let (mut ws, _response) = connect_async(url).await?;
    let challenge = serde_json::to_string(&AuthChallenge::new(token))?;
    ws.send(Message::Text(challenge)).await?;
    debug!("mattermost websocket connected");
    Ok(ws)
}

/// Forward event frames until the socket closes or the receiver goes away.
/// The stream always ends with an event named `disconnected`.
pub async fn read_loop(ws: WsStream, events: mpsc::Sender<WsEvent>, connected: Arc<AtomicBool>) {
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
                debug!(?frame, "mattermost websocket closed by server");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "mattermost websocket read failed");
                break;
            }
        };

        match serde_json::from_str::<WsEvent>(&text) {
            Ok(event) if event.event.is_empty() => trace!(frame = %text, "websocket reply"),
            Ok(event) => {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => trace!(error = %e, frame = %text, "unparsed websocket frame"),
        }
    }

    connected.store(false, Ordering::SeqCst);
    info!("mattermost websocket ended");
    let _ = events
        .send(WsEvent {
            event: "disconnected".into(),
            ..Default::default()
        })
        .await;
}
