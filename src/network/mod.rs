//! Network module.
//!
//! Contains the Gateway (TCP listener), the per-client Connection and the
//! registration handshake.

mod connection;
mod gateway;
pub mod handshake;

pub use connection::Connection;
pub use gateway::Gateway;
