//! Connection handlers for registered clients.
//!
//! Handles NICK, USER, PASS, PING, PONG, QUIT commands.

mod nick;
mod ping;

pub use nick::{NickHandler, PassHandler, UserHandler};
pub use ping::{PingHandler, PongHandler, QuitHandler};
