//! AWAY handler.

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};
use tracing::{debug, warn};

use super::{Context, Handler, HandlerResult};
use crate::bridge::Status;

/// Handler for AWAY command.
///
/// `AWAY [message]`. The backend presence follows: away with a message,
/// online without one. A backend failure does not undo the local state.
pub struct AwayHandler;

#[async_trait]
impl Handler for AwayHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let message = match &msg.command {
            Command::AWAY(Some(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        };
        let status = if message.is_some() {
            Status::Away
        } else {
            Status::Online
        };
        ctx.user.set_away(message);

        if let Some(bridge) = ctx.user.bridge() {
            match bridge.set_status(status).await {
                Ok(()) => debug!(nick = %ctx.nick(), status = ?status, "backend presence set"),
                Err(e) => warn!(nick = %ctx.nick(), error = %e, "could not set backend presence"),
            }
        }

        let (response, text) = match status {
            Status::Away => (
                Response::RPL_NOWAWAY,
                "You have been marked as being away",
            ),
            Status::Online => (
                Response::RPL_UNAWAY,
                "You are no longer marked as being away",
            ),
        };
        ctx.reply(response, vec![text.to_string()]).await;
        Ok(())
    }
}
