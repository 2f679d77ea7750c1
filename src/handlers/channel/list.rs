//! LIST command handler.

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};

use super::super::helpers::parse_list;
use super::super::{Context, Handler, HandlerResult};
use crate::state::casemap::irc_eq;
use crate::state::irc_channel_name;

/// Handler for LIST command.
///
/// `LIST [<channels>]`. Logged in, this lists the backend's channels (the
/// user count is only known for channels already materialized here);
/// otherwise the local channels.
pub struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let filter: Option<Vec<String>> = match &msg.command {
            Command::LIST(Some(list), _) => Some(parse_list(list).map(str::to_string).collect()),
            _ => None,
        };

        let entries: Vec<(String, usize, String)> = match ctx.user.bridge() {
            Some(bridge) => bridge
                .list()
                .await?
                .into_iter()
                .filter(|info| !info.direct)
                .map(|info| {
                    let users = ctx.server.has_channel(&info.id).map_or(0, |ch| ch.len());
                    (irc_channel_name(&info.name), users, info.topic)
                })
                .collect(),
            None => ctx
                .server
                .channels()
                .into_iter()
                .map(|ch| (ch.name().to_string(), ch.len(), ch.topic().text))
                .collect(),
        };

        let mut entries: Vec<_> = entries
            .into_iter()
            .filter(|(name, _, _)| {
                filter
                    .as_ref()
                    .is_none_or(|wanted| wanted.iter().any(|w| irc_eq(w, name)))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, users, topic) in entries {
            ctx.reply(Response::RPL_LIST, vec![name, users.to_string(), topic])
                .await;
        }
        ctx.reply(Response::RPL_LISTEND, vec!["End of /LIST".to_string()])
            .await;
        Ok(())
    }
}
