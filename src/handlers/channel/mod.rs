//! Channel command handlers.
//!
//! Handles JOIN, PART, TOPIC, NAMES, LIST, INVITE, KICK commands. Channels
//! with a backend counterpart are changed on the backend first; the local
//! registry follows once the backend accepted the change.

mod invite;
mod join;
mod kick;
mod list;
mod names;
mod part;
mod topic;

pub use invite::InviteHandler;
pub use join::JoinHandler;
pub use kick::KickHandler;
pub use list::ListHandler;
pub use names::NamesHandler;
pub use part::PartHandler;
pub use topic::TopicHandler;

use std::sync::Arc;

use super::{Context, HandlerError};
use crate::state::Channel;

/// Resolve a channel the client is in.
#[allow(clippy::result_large_err)]
pub(super) fn joined_channel(ctx: &Context, name: &str) -> Result<Arc<Channel>, HandlerError> {
    let ch = ctx
        .server
        .has_channel(name)
        .ok_or_else(|| HandlerError::NoSuchChannel(name.to_string()))?;
    if !ch.has_member(&ctx.user) {
        return Err(HandlerError::NotOnChannel(name.to_string()));
    }
    Ok(ch)
}
