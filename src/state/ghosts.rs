//! Process-wide cache of backend identities.
//!
//! Bridges look remote users up here before asking the backend. Entries are
//! keyed by `(team_id, user_id)` and outlive the connection that created them.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

use crate::bridge::UserInfo;

type GhostKey = (String, String);

pub struct GhostCache {
    entries: DashMap<GhostKey, UserInfo>,
    /// Insertion order, oldest first.
    order: Mutex<VecDeque<GhostKey>>,
    /// 0 = unbounded.
    max_entries: usize,
}

impl GhostCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    pub fn get(&self, team_id: &str, user_id: &str) -> Option<UserInfo> {
        self.entries
            .get(&(team_id.to_string(), user_id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Insert or refresh an identity. Refreshing keeps its age.
    pub fn insert(&self, info: UserInfo) {
        let key = (info.team_id.clone(), info.id.clone());
        // `me` is relative to one login; never share it
        let info = UserInfo { me: false, ..info };

        let mut order = self.order.lock();
        if self.entries.insert(key.clone(), info).is_some() {
            return;
        }
        order.push_back(key);

        if self.max_entries > 0 {
            while order.len() > self.max_entries {
                if let Some(oldest) = order.pop_front() {
                    debug!(team = %oldest.0, user = %oldest.1, "evicting ghost identity");
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
