//! State management module.
//!
//! [`Shared`] is the process-wide context (configuration, backend connector,
//! ghost identity cache, uid generator, command handlers). Each IRC
//! connection gets its own [`Server`]: a registry of the users and channels
//! that connection sees.

pub mod casemap;
mod channel;
mod echo;
mod ghosts;
mod server;
mod uid;
mod user;

pub use channel::Channel;
#[cfg(test)]
pub use echo::ECHO_RECHECK;
pub use echo::{EchoIds, PendingEchoes};
pub use ghosts::GhostCache;
pub use server::{Server, Shared, irc_channel_name};
pub use user::{OUTBOUND_QUEUE, User};
