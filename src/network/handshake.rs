//! Registration handshake.
//!
//! Consumes NICK, USER and PASS until both a nick and a username are known,
//! then inserts the user into the registry. A nick collision re-prompts
//! instead of failing. The handshake fails if registration does not complete
//! within [`HANDSHAKE_MSG_TOLERANCE`] messages, or if no message arrives for
//! [`HANDSHAKE_WAIT`].

use irc_proto::{Command, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{HandlerError, HandshakeError};
use crate::handlers::command_name;
use crate::state::{Server, User};

/// Messages accepted before registration must be complete.
pub const HANDSHAKE_MSG_TOLERANCE: usize = 20;

/// Longest wait for the next message during the handshake.
pub const HANDSHAKE_WAIT: Duration = Duration::from_secs(10);

/// Identity collected so far.
#[derive(Debug, Default)]
struct Pending {
    nick: String,
    username: String,
    realname: String,
    pass: Option<Vec<String>>,
}

impl Pending {
    fn complete(&self) -> bool {
        !self.nick.is_empty() && !self.username.is_empty()
    }
}

/// Run the handshake for `user`.
///
/// On success the user is in the registry and the PASS arguments, if any,
/// are returned for the backend login.
pub async fn negotiate(
    server: &Arc<Server>,
    user: &Arc<User>,
    inbound: &mut mpsc::Receiver<Message>,
) -> Result<Option<Vec<String>>, HandshakeError> {
    let mut pending = Pending::default();

    for _ in 0..HANDSHAKE_MSG_TOLERANCE {
        let msg = match timeout(HANDSHAKE_WAIT, inbound.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => return Err(HandshakeError::Disconnected),
            Err(_) => {
                warn!(host = %user.host(), "handshake timed out");
                return Err(HandshakeError::Timeout(HANDSHAKE_WAIT));
            }
        };

        match msg.command {
            Command::NICK(nick) => pending.nick = server.truncate_nick(&nick),
            Command::USER(username, _, realname) => {
                pending.username = username;
                pending.realname = realname;
            }
            Command::PASS(pass) => pending.pass = Some(split_pass(&[pass])),
            Command::Raw(ref cmd, ref args) if cmd.eq_ignore_ascii_case("PASS") => {
                pending.pass = Some(split_pass(args));
            }
            Command::PING(token, _) => {
                user.send(Message {
                    tags: None,
                    prefix: Some(server.prefix()),
                    command: Command::PONG(server.name().to_string(), Some(token)),
                })
                .await;
            }
            Command::QUIT(_) => return Err(HandshakeError::Disconnected),
            ref other => {
                if matches!(other, Command::JOIN(..)) {
                    reject(server, user, HandlerError::NotRegistered).await;
                }
                debug!(command = %command_name(other), "ignored before registration");
            }
        }

        if !pending.complete() {
            continue;
        }

        user.set_nick(&pending.nick);
        user.set_registration(&pending.username, &pending.realname);
        if server.add(user) {
            info!(nick = %pending.nick, host = %user.host(), "registration complete");
            return Ok(pending.pass);
        }

        debug!(nick = %pending.nick, "nick taken during handshake");
        let nick = std::mem::take(&mut pending.nick);
        user.set_nick("");
        reject(server, user, HandlerError::NicknameInUse(nick)).await;
    }

    warn!(host = %user.host(), "handshake message budget exhausted");
    Err(HandshakeError::BudgetExceeded(HANDSHAKE_MSG_TOLERANCE))
}

/// PASS arguments as login words.
///
/// `PASS :token`, `PASS :host team user pass` and `PASS host team user pass`
/// all split on whitespace. One word logs in to Slack, more go to Mattermost.
fn split_pass(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(str::to_string)
        .collect()
}

async fn reject(server: &Server, user: &User, err: HandlerError) {
    if let Some(reply) = err.to_irc_reply(server.name(), "*") {
        user.send(reply).await;
    }
}
