//! PART command handler.
//!
//! ## Syntax
//! ```text
//! PART <channels> [<reason>]
//! ```

use async_trait::async_trait;
use irc_proto::{Command, Message};
use std::sync::Arc;
use tracing::info;

use super::super::helpers::parse_list;
use super::super::{Context, Handler, HandlerError, HandlerResult};
use super::joined_channel;
use crate::state::Channel;

pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::PART(list, reason) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("PART"));
        };

        for name in parse_list(list) {
            let result = match joined_channel(ctx, name) {
                Ok(ch) => leave(ctx, &ch, reason.as_deref()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                ctx.report(e).await;
            }
        }
        Ok(())
    }
}

/// Leave `ch` on the backend, then locally.
pub(super) async fn leave(ctx: &Context, ch: &Arc<Channel>, reason: Option<&str>) -> HandlerResult {
    if ch.is_bridged()
        && let Some(bridge) = ctx.user.bridge()
    {
        bridge.part(ch.id()).await?;
    }
    ctx.server.part_channel(&ctx.user, ch, reason).await;
    info!(nick = %ctx.nick(), channel = %ch.name(), "parted channel");
    Ok(())
}
