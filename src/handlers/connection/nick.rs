//! NICK after registration, and the registration-only USER/PASS.

use async_trait::async_trait;
use irc_proto::{Command, Message};

use super::super::{Context, Handler, HandlerError, HandlerResult};

/// Handler for NICK command.
///
/// `NICK <nickname>`
pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::NICK(nick) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("NICK"));
        };
        ctx.server.rename_user(&ctx.user, nick).await
    }
}

/// Handler for USER command. Only valid during the handshake.
pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, _ctx: &Context, _msg: &Message) -> HandlerResult {
        Err(HandlerError::AlreadyRegistered)
    }
}

/// Handler for PASS command. Credentials after registration go through the
/// service user's `LOGIN` instead.
pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    async fn handle(&self, _ctx: &Context, _msg: &Message) -> HandlerResult {
        Err(HandlerError::AlreadyRegistered)
    }
}
