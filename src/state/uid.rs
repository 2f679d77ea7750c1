//! Server-local user identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates unique user IDs.
///
/// Format: SID (3 chars) + client counter (6 chars base36), e.g. `0SBAAAAAC`.
/// Uids key channel membership, so they stay stable across nick changes.
/// One generator is shared by every connection of the process.
pub struct UidGenerator {
    sid: String,
    counter: AtomicU64,
}

/// AAAAAA and AAAAAB belong to the `slack` and `mattermost` service users.
const UID_COUNTER_START: u64 = 2;

impl UidGenerator {
    pub fn new(sid: String) -> Self {
        Self {
            sid,
            counter: AtomicU64::new(UID_COUNTER_START),
        }
    }

    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.sid, base36_encode_6(n))
    }

    /// Uid of a reserved slot below the counter start.
    pub fn reserved(&self, slot: u64) -> String {
        debug_assert!(slot < UID_COUNTER_START);
        format!("{}{}", self.sid, base36_encode_6(slot))
    }
}

fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut out = [b'A'; 6];
    for slot in out.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }
    out.iter().map(|&b| b as char).collect()
}
