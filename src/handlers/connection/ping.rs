//! PING, PONG and QUIT handlers.

use async_trait::async_trait;
use irc_proto::{Command, Message};
use tracing::info;

use super::super::{Context, Handler, HandlerError, HandlerResult};

/// Handler for PING command.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        // PING <token>
        let token = match &msg.command {
            Command::PING(token, _) => token.clone(),
            _ => return Err(HandlerError::NeedMoreParams("PING")),
        };
        ctx.user
            .send(Message {
                tags: None,
                prefix: Some(ctx.server.prefix()),
                command: Command::PONG(ctx.server_name().to_string(), Some(token)),
            })
            .await;
        Ok(())
    }
}

/// Handler for PONG command.
pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, _ctx: &Context, _msg: &Message) -> HandlerResult {
        Ok(())
    }
}

/// Handler for QUIT command.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let reason = match &msg.command {
            Command::QUIT(reason) => reason.clone(),
            _ => None,
        };
        info!(nick = %ctx.nick(), reason = ?reason, "client sent QUIT");

        // The command loop runs the teardown
        Err(HandlerError::Quit(reason))
    }
}
