//! TOPIC command handler.

use async_trait::async_trait;
use irc_proto::{Command, Message};
use tracing::info;

use super::super::{Context, Handler, HandlerError, HandlerResult};
use super::joined_channel;

/// Handler for TOPIC command.
///
/// `TOPIC <channel> [<topic>]`
pub struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::TOPIC(name, text) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("TOPIC"));
        };
        let ch = joined_channel(ctx, name)?;

        let Some(text) = text else {
            ch.send_topic(&ctx.user).await;
            return Ok(());
        };

        if ch.is_bridged() {
            ctx.bridge()?.set_topic(ch.id(), text).await?;
        }
        ch.set_topic(&ctx.user, text).await;
        info!(nick = %ctx.nick(), channel = %ch.name(), "topic changed");
        Ok(())
    }
}
