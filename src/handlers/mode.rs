//! MODE handler.
//!
//! Membership and topic are owned by the backend, so modes are reported
//! but never changed.

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};

use super::{Context, Handler, HandlerError, HandlerResult};
use crate::state::casemap::irc_eq;

pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        match &msg.command {
            Command::ChannelMODE(target, _) => {
                let ch = ctx
                    .server
                    .has_channel(target)
                    .ok_or_else(|| HandlerError::NoSuchChannel(target.clone()))?;
                ctx.reply(
                    Response::RPL_CHANNELMODEIS,
                    vec![ch.name().to_string(), ch.modes().as_mode_string()],
                )
                .await;
            }
            Command::UserMODE(target, _) => {
                if !irc_eq(target, &ctx.nick()) {
                    return Err(HandlerError::NoSuchNick(target.clone()));
                }
                ctx.reply(Response::RPL_UMODEIS, vec!["+".to_string()]).await;
            }
            _ => return Err(HandlerError::NeedMoreParams("MODE")),
        }
        Ok(())
    }
}
