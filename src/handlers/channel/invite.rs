//! INVITE command handler.

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};
use tracing::info;

use super::super::{Context, Handler, HandlerError, HandlerResult};
use super::joined_channel;

/// Handler for INVITE command.
///
/// `INVITE <nick> <channel>`. The backend adds the user; the resulting
/// membership event shows the join here.
pub struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::INVITE(nick, channel) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("INVITE"));
        };
        let bridge = ctx.bridge()?;
        let ch = joined_channel(ctx, channel)?;
        let target = ctx
            .server
            .has_user(nick)
            .filter(|u| !u.backend_id().is_empty())
            .ok_or_else(|| HandlerError::NoSuchNick(nick.clone()))?;

        bridge.invite(ch.id(), &target.backend_id()).await?;
        info!(nick = %ctx.nick(), target = %target.nick(), channel = %ch.name(), "invited");
        ctx.reply(
            Response::RPL_INVITING,
            vec![target.nick(), ch.name().to_string()],
        )
        .await;
        Ok(())
    }
}
