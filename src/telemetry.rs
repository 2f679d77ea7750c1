//! Telemetry utilities for command timing and span construction.

use std::time::Instant;
use tracing::trace;

/// Guard for timing command execution.
///
/// Logs the command latency at trace level when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let micros = self.start.elapsed().as_micros() as u64;
        trace!(command = %self.command, micros, "command finished");
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a client connection.
    pub fn connection(conn_id: u64, peer: &str) -> Span {
        info_span!("connection", conn_id, peer = %peer)
    }

    /// Create a span for a command execution.
    pub fn command(name: &str, nick: &str) -> Span {
        info_span!("irc.command", command = %name, nick = %nick)
    }

    /// Create a span for one backend login.
    pub fn bridge(service: &str, nick: &str) -> Span {
        info_span!("bridge", service = %service, nick = %nick)
    }
}
