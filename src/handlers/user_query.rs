//! User query handlers: WHO, WHOIS

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};
use std::sync::Arc;

use super::helpers::{is_channel_name, parse_list};
use super::{Context, Handler, HandlerError, HandlerResult};
use crate::state::User;

/// Handler for WHO command.
///
/// `WHO [<channel>|<nick>]`; without a mask every known user is listed.
pub struct WhoHandler;

#[async_trait]
impl Handler for WhoHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let mask = match &msg.command {
            Command::WHO(Some(mask), _) if mask != "0" => mask.clone(),
            _ => "*".to_string(),
        };

        if is_channel_name(&mask) {
            if let Some(ch) = ctx.server.has_channel(&mask) {
                let mut members = ch.members();
                members.sort_by_key(|m| m.nick());
                for member in members {
                    who_reply(ctx, ch.name(), &member).await;
                }
            }
        } else if mask == "*" {
            let mut users = ctx.server.users();
            users.sort_by_key(|u| u.nick());
            for user in users {
                who_reply(ctx, "*", &user).await;
            }
        } else if let Some(user) = ctx.server.has_user(&mask) {
            who_reply(ctx, "*", &user).await;
        }

        ctx.reply(
            Response::RPL_ENDOFWHO,
            vec![mask, "End of /WHO list".to_string()],
        )
        .await;
        Ok(())
    }
}

async fn who_reply(ctx: &Context, channel: &str, user: &User) {
    let flags = if user.away().is_some() { "G" } else { "H" };
    ctx.reply(
        Response::RPL_WHOREPLY,
        vec![
            channel.to_string(),
            user.username(),
            user.host(),
            ctx.server_name().to_string(),
            user.nick(),
            flags.to_string(),
            format!("0 {}", user.realname()),
        ],
    )
    .await;
}

/// Handler for WHOIS command.
///
/// `WHOIS [<server>] <nicks>`
pub struct WhoisHandler;

#[async_trait]
impl Handler for WhoisHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let Command::WHOIS(_, masks) = &msg.command else {
            return Err(HandlerError::NoRecipient);
        };

        for nick in parse_list(masks) {
            match ctx.server.has_user(nick) {
                Some(user) => whois(ctx, &user).await,
                None => ctx.report(HandlerError::NoSuchNick(nick.to_string())).await,
            }
            ctx.reply(
                Response::RPL_ENDOFWHOIS,
                vec![nick.to_string(), "End of /WHOIS list".to_string()],
            )
            .await;
        }
        Ok(())
    }
}

async fn whois(ctx: &Context, user: &Arc<User>) {
    let nick = user.nick();
    ctx.reply(
        Response::RPL_WHOISUSER,
        vec![
            nick.clone(),
            user.username(),
            user.host(),
            "*".to_string(),
            user.realname(),
        ],
    )
    .await;

    let mut channels: Vec<String> = ctx
        .server
        .user_channels(user)
        .iter()
        .map(|ch| ch.name().to_string())
        .collect();
    if !channels.is_empty() {
        channels.sort();
        ctx.reply(
            Response::RPL_WHOISCHANNELS,
            vec![nick.clone(), channels.join(" ")],
        )
        .await;
    }

    let info = if let Some(service) = ctx.server.service_of(user) {
        format!("{service} login service")
    } else if user.is_ghost() {
        let backend = ctx
            .user
            .bridge()
            .map_or("backend", |b| b.protocol().name());
        format!("{backend} user {}", user.backend_id())
    } else {
        format!("slircd-bridge {}", ctx.server.version())
    };
    ctx.reply(
        Response::RPL_WHOISSERVER,
        vec![nick.clone(), ctx.server_name().to_string(), info],
    )
    .await;

    if let Some(away) = user.away() {
        ctx.reply(Response::RPL_AWAY, vec![nick, away]).await;
    }
}
