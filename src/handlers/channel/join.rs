//! JOIN command handler.
//!
//! ## Syntax
//! ```text
//! JOIN <channels>
//! JOIN 0
//! ```
//!
//! ## Behavior
//! - Logged in: the backend joins first, then the channel is materialized
//!   with its members as ghosts and the local user joins (topic + names).
//! - Not logged in: a channel that exists only on this server.
//! - `JOIN 0` parts every channel.

use async_trait::async_trait;
use irc_proto::{Command, Message};
use tracing::info;

use super::super::helpers::{is_channel_name, parse_list};
use super::super::{Context, Handler, HandlerError, HandlerResult};
use super::part::leave;

pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::JOIN(list, _, _) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("JOIN"));
        };

        if list == "0" {
            for ch in ctx.server.user_channels(&ctx.user) {
                if let Err(e) = leave(ctx, &ch, None).await {
                    ctx.report(e).await;
                }
            }
            return Ok(());
        }

        for name in parse_list(list) {
            if let Err(e) = join_one(ctx, name).await {
                ctx.report(e).await;
            }
        }
        Ok(())
    }
}

async fn join_one(ctx: &Context, name: &str) -> HandlerResult {
    if !is_channel_name(name) {
        return Err(HandlerError::NoSuchChannel(name.to_string()));
    }
    if ctx
        .server
        .has_channel(name)
        .is_some_and(|ch| ch.has_member(&ctx.user))
    {
        return Ok(());
    }

    match ctx.user.bridge() {
        Some(bridge) => {
            let info = bridge.join(name.trim_start_matches(['#', '&'])).await?;
            let ch = ctx
                .server
                .join_bridged(&ctx.user, bridge.as_ref(), &info.id)
                .await;
            info!(nick = %ctx.nick(), channel = %ch.name(), channel_id = %info.id, "joined backend channel");
        }
        None => {
            let ch = ctx.server.local_channel(name);
            ch.join(&ctx.user).await;
            info!(nick = %ctx.nick(), channel = %ch.name(), "joined local channel");
        }
    }
    Ok(())
}
