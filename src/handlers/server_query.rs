//! Server query handlers: MOTD, LUSERS

use async_trait::async_trait;
use irc_proto::{Message, Response};

use super::{Context, Handler, HandlerResult};

/// Handler for MOTD command.
pub struct MotdHandler;

#[async_trait]
impl Handler for MotdHandler {
    async fn handle(&self, ctx: &Context, _msg: &Message) -> HandlerResult {
        ctx.server.send_motd(&ctx.user).await;
        Ok(())
    }
}

/// Handler for LUSERS command.
pub struct LusersHandler;

#[async_trait]
impl Handler for LusersHandler {
    async fn handle(&self, ctx: &Context, _msg: &Message) -> HandlerResult {
        ctx.server.send_lusers(&ctx.user).await;
        ctx.reply(
            Response::RPL_LUSERCHANNELS,
            vec![
                ctx.server.channel_count().to_string(),
                "channels formed".to_string(),
            ],
        )
        .await;
        Ok(())
    }
}
