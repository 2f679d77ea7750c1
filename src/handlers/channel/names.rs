//! NAMES command handler.

use async_trait::async_trait;
use irc_proto::{Command, Message, Response};

use super::super::helpers::parse_list;
use super::super::{Context, Handler, HandlerResult};

/// Handler for NAMES command.
///
/// `NAMES [<channels>]`; without arguments, every channel the client is in.
pub struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, ctx: &Context, msg: &Message) -> HandlerResult {
        let list = match &msg.command {
            Command::NAMES(list, _) => list.clone(),
            _ => None,
        };

        let Some(list) = list else {
            for ch in ctx.server.user_channels(&ctx.user) {
                ch.send_names(&ctx.user).await;
            }
            return Ok(());
        };

        for name in parse_list(&list) {
            match ctx.server.has_channel(name) {
                Some(ch) => ch.send_names(&ctx.user).await,
                None => {
                    ctx.reply(
                        Response::RPL_ENDOFNAMES,
                        vec![name.to_string(), "End of /NAMES list".to_string()],
                    )
                    .await
                }
            }
        }
        Ok(())
    }
}
