//! Self-echo suppression.
//!
//! Every outbound post records its backend message id per channel. When the
//! backend later streams a message authored by the logged-in account, the
//! translator asks [`PendingEchoes::suppress`] whether it is the copy of our
//! own post.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Bounded wait before re-checking an unmatched echo once.
///
/// The event stream can deliver a just-posted message before the post call
/// returns its id.
pub const ECHO_RECHECK: Duration = Duration::from_millis(100);

/// The most recent locally sent message on one channel.
#[derive(Debug, Clone)]
pub struct PendingEcho {
    pub message_id: String,
    pub sent_at: Instant,
}

/// How message ids of a backend relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoIds {
    /// Ids are timestamps (Slack `ts`): only a recorded id older than the
    /// inbound one can be a not-yet-recorded post.
    Timestamp,
    /// Ids are opaque: any mismatch may be a not-yet-recorded post.
    Opaque,
}

/// Per-channel last-sent markers for one backend login.
#[derive(Debug, Default)]
pub struct PendingEchoes {
    inner: Mutex<HashMap<String, PendingEcho>>,
}

impl PendingEchoes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message id just returned by the backend for `channel_id`.
    pub fn record(&self, channel_id: &str, message_id: &str) {
        self.inner.lock().insert(
            channel_id.to_string(),
            PendingEcho {
                message_id: message_id.to_string(),
                sent_at: Instant::now(),
            },
        );
    }

    pub fn last(&self, channel_id: &str) -> Option<PendingEcho> {
        self.inner.lock().get(channel_id).cloned()
    }

    /// Remove the record if it carries `message_id`.
    fn consume(&self, channel_id: &str, message_id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.get(channel_id) {
            Some(pending) if pending.message_id == message_id => {
                inner.remove(channel_id);
                true
            }
            _ => false,
        }
    }

    /// Decide whether an inbound message from our own account is an echo.
    ///
    /// Waits [`ECHO_RECHECK`] at most once. A match consumes the record.
    pub async fn suppress(&self, channel_id: &str, message_id: &str, ids: EchoIds) -> bool {
        if self.consume(channel_id, message_id) {
            return true;
        }

        let recorded = self.last(channel_id);
        let wait = match (&recorded, ids) {
            (None, _) => true,
            (Some(_), EchoIds::Opaque) => true,
            (Some(pending), EchoIds::Timestamp) => {
                compare_ts(&pending.message_id, message_id) == Ordering::Less
            }
        };
        if !wait {
            return false;
        }

        trace!(channel = %channel_id, id = %message_id, "echo not recorded yet, rechecking");
        tokio::time::sleep(ECHO_RECHECK).await;
        self.consume(channel_id, message_id)
    }
}

/// Order two Slack-style `seconds.micros` timestamps.
fn compare_ts(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}
