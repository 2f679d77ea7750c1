//! Unified error handling for slircd-bridge.
//!
//! This module provides the error hierarchy for the bridge: command handler
//! errors (with IRC reply generation), handshake failures, and backend
//! bridge failures.

use irc_proto::{Command, Message, Prefix, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
#[allow(clippy::large_enum_variant)] // Send variant is large but rarely constructed
pub enum HandlerError {
    #[error("not enough parameters for {0}")]
    NeedMoreParams(&'static str),

    #[error("no text to send")]
    NoTextToSend,

    #[error("no recipient given")]
    NoRecipient,

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("not logged in to a backend")]
    NotLoggedIn,

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<Message>),

    #[error("client quit: {0:?}")]
    Quit(Option<String>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams(_) => "need_more_params",
            Self::NoTextToSend => "no_text_to_send",
            Self::NoRecipient => "no_recipient",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered => "already_registered",
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::NoSuchNick(_) => "no_such_nick",
            Self::NotOnChannel(_) => "not_on_channel",
            Self::UnknownCommand(_) => "unknown_command",
            Self::NotLoggedIn => "not_logged_in",
            Self::Bridge(_) => "bridge_error",
            Self::Send(_) => "send_error",
            Self::Quit(_) => "quit",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Convert to an IRC error reply message.
    ///
    /// Returns `None` for errors that don't warrant a client-visible reply
    /// (unknown commands, send failures, quit, internal errors).
    pub fn to_irc_reply(&self, server_name: &str, nick: &str) -> Option<Message> {
        let nick = nick.to_string();
        let (response, args) = match self {
            Self::NeedMoreParams(cmd) => (
                Response::ERR_NEEDMOREPARAMS,
                vec![nick, cmd.to_string(), "Not enough parameters".to_string()],
            ),
            Self::NoTextToSend => (
                Response::ERR_NOTEXTTOSEND,
                vec![nick, "No text to send".to_string()],
            ),
            Self::NoRecipient => (
                Response::ERR_NORECIPIENT,
                vec![nick, "No recipient given".to_string()],
            ),
            Self::NicknameInUse(bad_nick) => (
                Response::ERR_NICKNAMEINUSE,
                vec![nick, bad_nick.clone(), "Nickname is already in use".to_string()],
            ),
            Self::NotRegistered => (
                Response::ERR_NOTREGISTERED,
                vec![nick, "Please register first".to_string()],
            ),
            Self::AlreadyRegistered => (
                Response::ERR_ALREADYREGISTRED,
                vec![nick, "You may not reregister".to_string()],
            ),
            Self::NoSuchChannel(chan) => (
                Response::ERR_NOSUCHCHANNEL,
                vec![nick, chan.clone(), "No such channel".to_string()],
            ),
            Self::NoSuchNick(target) => (
                Response::ERR_NOSUCHNICK,
                vec![nick, target.clone(), "No such nick/channel".to_string()],
            ),
            Self::NotOnChannel(chan) => (
                Response::ERR_NOTONCHANNEL,
                vec![nick, chan.clone(), "You're not on that channel".to_string()],
            ),
            Self::NotLoggedIn => (
                Response::ERR_NOTREGISTERED,
                vec![nick, "You are not logged in to a backend".to_string()],
            ),
            Self::Bridge(e) => (
                Response::ERR_CANNOTSENDTOCHAN,
                vec![nick, "*".to_string(), e.to_string()],
            ),

            // These errors don't get client-visible replies
            Self::UnknownCommand(_) => return None,
            Self::Send(_) => return None,
            Self::Quit(_) => return None,
            Self::Internal(_) => return None,
        };

        Some(Message {
            tags: None,
            prefix: Some(Prefix::ServerName(server_name.to_string())),
            command: Command::Response(response, args),
        })
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Handshake Errors (registration)
// ============================================================================

/// Terminal handshake failures. The connection is closed and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("handshake failed: no message within {0:?}")]
    Timeout(Duration),

    #[error("handshake failed: {0} messages consumed without registration")]
    BudgetExceeded(usize),

    #[error("handshake failed: client disconnected")]
    Disconnected,
}

// ============================================================================
// Bridge Errors (backend operations)
// ============================================================================

/// Backend bridge failures.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend api error: {0}")]
    Api(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("login not allowed: {0}")]
    NotAllowed(String),

    #[error("bad credentials: {0}")]
    Credentials(String),

    #[error("not connected")]
    NotConnected,
}
