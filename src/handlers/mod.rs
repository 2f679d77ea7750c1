//! IRC command handlers.
//!
//! This module contains the Handler trait and command registry for dispatching
//! the commands of a registered client. Registration itself (NICK/USER/PASS
//! before the welcome burst) is driven by `network::handshake`.

mod away;
mod channel;
mod connection;
mod helpers;
mod messaging;
mod mode;
mod server_query;
mod service;
mod user_query;

#[cfg(test)]
mod testing;

pub use away::AwayHandler;
pub use channel::{
    InviteHandler, JoinHandler, KickHandler, ListHandler, NamesHandler, PartHandler, TopicHandler,
};
pub use connection::{
    NickHandler, PassHandler, PingHandler, PongHandler, QuitHandler, UserHandler,
};
pub use helpers::{command_name, server_reply};
pub use messaging::{NoticeHandler, PrivmsgHandler};
pub use mode::ModeHandler;
pub use server_query::{LusersHandler, MotdHandler};
pub use user_query::{WhoHandler, WhoisHandler};

use async_trait::async_trait;
use irc_proto::{Message, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, debug};

use crate::bridge::Bridge;
use crate::state::{Server, User};
use crate::telemetry::{CommandTimer, spans};

pub use crate::error::{HandlerError, HandlerResult};

/// Handler context passed to each command handler.
pub struct Context {
    /// Registry of the connection the command arrived on.
    pub server: Arc<Server>,
    /// The connection's own user.
    pub user: Arc<User>,
}

impl Context {
    pub fn server_name(&self) -> &str {
        self.server.name()
    }

    pub fn nick(&self) -> String {
        self.user.nick()
    }

    /// Send a numeric to the client; `params` follow its nick.
    pub async fn reply(&self, response: Response, params: Vec<String>) {
        self.server.send_numeric(&self.user, response, params).await;
    }

    /// Send the numeric for a per-target failure and carry on with the rest
    /// of a target list.
    pub async fn report(&self, err: HandlerError) {
        debug!(code = err.error_code(), error = %err, "target failed");
        if let Some(reply) = err.to_irc_reply(self.server_name(), &self.nick()) {
            self.user.send(reply).await;
        }
    }

    /// The logged-in backend, or `NotLoggedIn`.
    #[allow(clippy::result_large_err)]
    pub fn bridge(&self) -> Result<Arc<dyn Bridge>, HandlerError> {
        self.user.bridge().ok_or(HandlerError::NotLoggedIn)
    }
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle an incoming message.
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult;
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("USER", Box::new(UserHandler));
        handlers.insert("PASS", Box::new(PassHandler));
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("PONG", Box::new(PongHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("TOPIC", Box::new(TopicHandler));
        handlers.insert("NAMES", Box::new(NamesHandler));
        handlers.insert("LIST", Box::new(ListHandler));
        handlers.insert("INVITE", Box::new(InviteHandler));
        handlers.insert("KICK", Box::new(KickHandler));
        handlers.insert("MODE", Box::new(ModeHandler));

        // Messaging handlers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("NOTICE", Box::new(NoticeHandler));

        // Queries
        handlers.insert("WHO", Box::new(WhoHandler));
        handlers.insert("WHOIS", Box::new(WhoisHandler));
        handlers.insert("MOTD", Box::new(MotdHandler));
        handlers.insert("LUSERS", Box::new(LusersHandler));

        handlers.insert("AWAY", Box::new(AwayHandler));

        Self { handlers }
    }

    pub fn commands(&self) -> Vec<&'static str> {
        let mut commands: Vec<_> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        commands
    }

    /// Dispatch a message to the appropriate handler.
    ///
    /// Handler errors are turned into numerics here. Only `Quit` and
    /// `UnknownCommand` are returned to the caller; neither produces a reply.
    pub async fn dispatch(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let name = command_name(&msg.command);
        let Some(handler) = self.handlers.get(name.as_str()) else {
            debug!(command = %name, nick = %ctx.nick(), "unknown command");
            return Err(HandlerError::UnknownCommand(name));
        };

        let span = spans::command(&name, &ctx.nick());
        let _timer = CommandTimer::new(name.as_str());
        match handler.handle(ctx, msg).instrument(span).await {
            Ok(()) => Ok(()),
            Err(HandlerError::Quit(reason)) => Err(HandlerError::Quit(reason)),
            Err(e) => {
                debug!(command = %name, code = e.error_code(), error = %e, "command failed");
                if let Some(reply) = e.to_irc_reply(ctx.server_name(), &ctx.nick()) {
                    ctx.user.send(reply).await;
                }
                Ok(())
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
