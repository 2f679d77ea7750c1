//! PRIVMSG and NOTICE handlers.
//!
//! Messages to a backend channel or to a ghost go to the backend; the
//! backend's copy of the message comes back as an echo and is suppressed.
//! Messages to a service user are service commands.

use async_trait::async_trait;
use irc_proto::{Command, Message};
use std::sync::Arc;
use tracing::debug;

use super::helpers::{ctcp_action, is_channel_name, is_ctcp, parse_list};
use super::{Context, Handler, HandlerError, HandlerResult, service};

/// Handler for PRIVMSG command.
pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let (targets, text) = message_args(&msg.command, "PRIVMSG")?;
        for target in parse_list(targets) {
            if let Err(e) = deliver(ctx, target, text, false).await {
                ctx.report(e).await;
            }
        }
        Ok(())
    }
}

/// Handler for NOTICE command. Failures are never answered.
pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Ok((targets, text)) = message_args(&msg.command, "NOTICE") else {
            return Ok(());
        };
        for target in parse_list(targets) {
            if let Err(e) = deliver(ctx, target, text, true).await {
                debug!(target = %target, error = %e, "notice dropped");
            }
        }
        Ok(())
    }
}

#[allow(clippy::result_large_err)]
fn message_args<'a>(
    command: &'a Command,
    name: &'static str,
) -> Result<(&'a str, &'a str), HandlerError> {
    match command {
        Command::PRIVMSG(target, text) | Command::NOTICE(target, text) => {
            if text.is_empty() {
                Err(HandlerError::NoTextToSend)
            } else {
                Ok((target, text))
            }
        }
        Command::Raw(_, args) if args.is_empty() => Err(HandlerError::NoRecipient),
        Command::Raw(_, args) if args.len() == 1 => Err(HandlerError::NoTextToSend),
        _ => Err(HandlerError::NeedMoreParams(name)),
    }
}

/// Text as the backend should see it: `/me` becomes `_text_`, other CTCP
/// requests are not relayed.
fn backend_text(text: &str) -> Option<String> {
    if let Some(action) = ctcp_action(text) {
        return Some(format!("_{action}_"));
    }
    if is_ctcp(text) {
        return None;
    }
    Some(text.to_string())
}

async fn deliver(ctx: &Context, target: &str, text: &str, notice: bool) -> HandlerResult {
    if is_channel_name(target) {
        let ch = ctx
            .server
            .has_channel(target)
            .ok_or_else(|| HandlerError::NoSuchNick(target.to_string()))?;
        if !ch.has_member(&ctx.user) {
            return Err(HandlerError::NotOnChannel(target.to_string()));
        }
        if !ch.is_bridged() {
            ch.message(&ctx.user, text).await;
            return Ok(());
        }
        let Some(text) = backend_text(text) else {
            debug!(channel = %ch.name(), "ctcp not relayed");
            return Ok(());
        };
        let id = ctx.bridge()?.msg_channel(ch.id(), &text).await?;
        debug!(channel = %ch.name(), message_id = %id, "sent to backend channel");
        return Ok(());
    }

    let peer = ctx
        .server
        .has_user(target)
        .ok_or_else(|| HandlerError::NoSuchNick(target.to_string()))?;

    if let Some(service) = ctx.server.service_of(&peer) {
        if !notice {
            service::command(ctx, service, &peer, text).await;
        }
        return Ok(());
    }

    if Arc::ptr_eq(&peer, &ctx.user) {
        ctx.user
            .send(Message {
                tags: None,
                prefix: Some(ctx.user.prefix()),
                command: Command::PRIVMSG(peer.nick(), text.to_string()),
            })
            .await;
        return Ok(());
    }

    let peer_id = peer.backend_id();
    if peer_id.is_empty() {
        return Err(HandlerError::NoSuchNick(target.to_string()));
    }
    let Some(text) = backend_text(text) else {
        return Ok(());
    };
    let id = ctx.bridge()?.msg_user(&peer_id, &text).await?;
    debug!(peer = %peer.nick(), message_id = %id, "sent direct message");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{bob, drain, line, logged_in, setup};
    use irc_proto::Response;

    #[tokio::test]
    async fn test_channel_message_goes_to_backend_and_records_echo() {
        let (ctx, mut rx, bridge) = logged_in();
        ctx.server
            .join_bridged(&ctx.user, bridge.as_ref(), "C1")
            .await;
        drain(&mut rx);

        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG #general :hello there"))
            .await
            .unwrap();
        assert!(bridge.calls().contains(&"msg C1 hello there".to_string()));
        // nothing echoed locally
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_action_is_rendered_for_backend() {
        let (ctx, _rx, bridge) = logged_in();
        ctx.server.ghost(&bob());
        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG bob :\x01ACTION waves hello\x01"))
            .await
            .unwrap();
        assert!(bridge.calls().contains(&"msg U2 _waves hello_".to_string()));
    }

    #[tokio::test]
    async fn test_ctcp_version_is_not_relayed() {
        let (ctx, _rx, bridge) = logged_in();
        ctx.server.ghost(&bob());
        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG bob :\x01VERSION\x01"))
            .await
            .unwrap();
        assert!(!bridge.calls().iter().any(|c| c.starts_with("msg")));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let (ctx, mut rx) = setup();
        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG nobody :are you there"))
            .await
            .unwrap();
        let out = drain(&mut rx);
        assert!(matches!(
            out[0].command,
            Command::Response(Response::ERR_NOSUCHNICK, ref args) if args[1] == "nobody"
        ));
    }

    #[tokio::test]
    async fn test_missing_text() {
        let (ctx, _rx) = setup();
        let err = PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NoTextToSend));
        let err = PrivmsgHandler.handle(&ctx, &line("PRIVMSG")).await.unwrap_err();
        assert!(matches!(err, HandlerError::NoRecipient));
    }

    #[tokio::test]
    async fn test_ghost_message_requires_login() {
        let (ctx, mut rx) = setup();
        ctx.server.ghost(&bob());
        NoticeHandler
            .handle(&ctx, &line("NOTICE bob :quiet please"))
            .await
            .unwrap();
        assert!(drain(&mut rx).is_empty());

        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG bob :loud please"))
            .await
            .unwrap();
        let out = drain(&mut rx);
        assert!(matches!(
            out[0].command,
            Command::Response(Response::ERR_NOTREGISTERED, _)
        ));
    }

    #[tokio::test]
    async fn test_service_user_gets_commands() {
        let (ctx, mut rx) = setup();
        PrivmsgHandler
            .handle(&ctx, &line("PRIVMSG slack :HELP me"))
            .await
            .unwrap();
        let out = drain(&mut rx);
        assert_eq!(out.len(), 4);
        assert!(matches!(out[0].prefix, Some(irc_proto::Prefix::Nickname(ref n, _, _)) if n == "slack"));
    }
}
