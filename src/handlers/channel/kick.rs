//! KICK command handler.

use async_trait::async_trait;
use irc_proto::{Command, Message};
use tracing::info;

use super::super::helpers::parse_list;
use super::super::{Context, Handler, HandlerError, HandlerResult};
use super::joined_channel;
use crate::state::Channel;

/// Handler for KICK command.
///
/// `KICK <channel> <nicks> [<reason>]`
pub struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::KICK(channel, nicks, reason) = &msg.command else {
            return Err(HandlerError::NeedMoreParams("KICK"));
        };
        let bridge = ctx.bridge()?;
        let ch = joined_channel(ctx, channel)?;
        let reason = reason.clone().unwrap_or_else(|| ctx.nick());

        for nick in parse_list(nicks) {
            let Some(target) = ctx.server.has_user(nick).filter(|u| ch.has_member(u)) else {
                ctx.report(HandlerError::NoSuchNick(nick.to_string())).await;
                continue;
            };
            if let Err(e) = bridge.kick(ch.id(), &target.backend_id()).await {
                ctx.report(e.into()).await;
                continue;
            }
            announce(ctx, &ch, &target.nick(), &reason).await;
            ch.remove_member(&target);
            info!(nick = %ctx.nick(), target = %target.nick(), channel = %ch.name(), "kicked");
        }
        Ok(())
    }
}

async fn announce(ctx: &Context, ch: &Channel, target: &str, reason: &str) {
    let kick = Message {
        tags: None,
        prefix: Some(ctx.user.prefix()),
        command: Command::KICK(
            ch.name().to_string(),
            target.to_string(),
            Some(reason.to_string()),
        ),
    };
    ch.broadcast(kick, None).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{drain, line, logged_in};
    use irc_proto::Response;

    #[tokio::test]
    async fn test_kick_ghost() {
        let (ctx, mut rx, bridge) = logged_in();
        ctx.server
            .join_bridged(&ctx.user, bridge.as_ref(), "C1")
            .await;
        drain(&mut rx);

        KickHandler
            .handle(&ctx, &line("KICK #general bob :too noisy today"))
            .await
            .unwrap();
        assert!(bridge.calls().contains(&"kick C1 U2".to_string()));
        let out = drain(&mut rx);
        assert_eq!(
            out[0].command,
            Command::KICK("#general".into(), "bob".into(), Some("too noisy today".into()))
        );
        let bob = ctx.server.has_user("bob").unwrap();
        assert!(!ctx.server.has_channel("C1").unwrap().has_member(&bob));
    }

    #[tokio::test]
    async fn test_kick_non_member() {
        let (ctx, mut rx, bridge) = logged_in();
        ctx.server
            .join_bridged(&ctx.user, bridge.as_ref(), "C1")
            .await;
        drain(&mut rx);

        KickHandler.handle(&ctx, &line("KICK #general carol")).await.unwrap();
        let out = drain(&mut rx);
        assert!(matches!(
            out[0].command,
            Command::Response(Response::ERR_NOSUCHNICK, _)
        ));
        assert!(!bridge.calls().iter().any(|c| c.starts_with("kick")));
    }
}
