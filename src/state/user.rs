//! IRC identities: the connected local user and ghosts.

use irc_proto::{Command, Message, Prefix};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

use crate::bridge::{Bridge, UserInfo};

/// Capacity of a local user's outbound queue.
pub const OUTBOUND_QUEUE: usize = 512;

/// One IRC identity.
///
/// The local user owns the connection's outbound queue and, once logged in,
/// the backend [`Bridge`]. Ghosts stand in for remote backend users and
/// have no queue; messages sent to them are dropped.
pub struct User {
    pub uid: String,
    info: RwLock<UserInfo>,
    away: RwLock<Option<String>>,
    /// Ids of the channels this user is in.
    channels: Mutex<HashSet<String>>,
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
    bridge: RwLock<Option<Arc<dyn Bridge>>>,
    /// Set while a backend login is in flight.
    logging_in: AtomicBool,
}

/// Exclusive right to log a user in; released on drop.
pub struct LoginClaim<'a>(&'a User);

impl Drop for LoginClaim<'_> {
    fn drop(&mut self) {
        self.0.logging_in.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("uid", &self.uid)
            .field("nick", &self.nick())
            .field("ghost", &self.is_ghost())
            .finish_non_exhaustive()
    }
}

impl User {
    /// A user backed by a live IRC connection. Nick and username are unset
    /// until the handshake provides them.
    pub fn local(uid: String, host: String, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            uid,
            info: RwLock::new(UserInfo {
                host,
                ..Default::default()
            }),
            away: RwLock::new(None),
            channels: Mutex::new(HashSet::new()),
            outbound: Mutex::new(Some(outbound)),
            bridge: RwLock::new(None),
            logging_in: AtomicBool::new(false),
        }
    }

    /// A ghost standing in for a backend identity.
    pub fn ghost(uid: String, info: UserInfo) -> Self {
        Self {
            uid,
            info: RwLock::new(UserInfo {
                ghost: true,
                ..info
            }),
            away: RwLock::new(None),
            channels: Mutex::new(HashSet::new()),
            outbound: Mutex::new(None),
            bridge: RwLock::new(None),
            logging_in: AtomicBool::new(false),
        }
    }

    pub fn nick(&self) -> String {
        self.info.read().nick.clone()
    }

    pub(crate) fn set_nick(&self, nick: &str) {
        self.info.write().nick = nick.to_string();
    }

    pub fn username(&self) -> String {
        self.info.read().user.clone()
    }

    pub fn realname(&self) -> String {
        self.info.read().real.clone()
    }

    pub fn host(&self) -> String {
        self.info.read().host.clone()
    }

    pub(crate) fn set_registration(&self, username: &str, realname: &str) {
        let mut info = self.info.write();
        info.user = username.to_string();
        info.real = realname.to_string();
    }

    /// Snapshot of the identity.
    pub fn info(&self) -> UserInfo {
        self.info.read().clone()
    }

    /// Backend user id; empty for an unbridged user.
    pub fn backend_id(&self) -> String {
        self.info.read().id.clone()
    }

    /// Adopt the backend identity of the logged-in account. The IRC nick,
    /// username and host are kept.
    pub fn set_backend_identity(&self, me: &UserInfo) {
        let mut info = self.info.write();
        info.id = me.id.clone();
        info.team_id = me.team_id.clone();
        info.display_name = me.display_name.clone();
        info.me = true;
    }

    pub fn clear_backend_identity(&self) {
        let mut info = self.info.write();
        info.id.clear();
        info.team_id.clear();
        info.display_name.clear();
        info.me = false;
    }

    pub fn is_ghost(&self) -> bool {
        self.info.read().ghost
    }

    pub fn prefix(&self) -> Prefix {
        let info = self.info.read();
        Prefix::Nickname(info.nick.clone(), info.user.clone(), info.host.clone())
    }

    pub fn away(&self) -> Option<String> {
        self.away.read().clone()
    }

    pub fn set_away(&self, message: Option<String>) {
        *self.away.write() = message;
    }

    pub fn bridge(&self) -> Option<Arc<dyn Bridge>> {
        self.bridge.read().clone()
    }

    pub fn set_bridge(&self, bridge: Arc<dyn Bridge>) {
        *self.bridge.write() = Some(bridge);
    }

    pub fn take_bridge(&self) -> Option<Arc<dyn Bridge>> {
        self.bridge.write().take()
    }

    /// Claim the login slot. `None` while another login is in flight or a
    /// bridge is already attached.
    pub(crate) fn begin_login(&self) -> Option<LoginClaim<'_>> {
        self.logging_in
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let claim = LoginClaim(self);
        if self.bridge.read().is_some() {
            return None;
        }
        Some(claim)
    }

    pub(crate) fn add_channel(&self, channel_id: &str) {
        self.channels.lock().insert(channel_id.to_string());
    }

    pub(crate) fn remove_channel(&self, channel_id: &str) {
        self.channels.lock().remove(channel_id);
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.lock().iter().cloned().collect()
    }

    pub fn in_channel(&self, channel_id: &str) -> bool {
        self.channels.lock().contains(channel_id)
    }

    /// Queue a message for this user's connection.
    ///
    /// Ghosts and closed connections swallow the message.
    pub async fn send(&self, msg: Message) {
        let tx = self.outbound.lock().clone();
        if let Some(tx) = tx
            && tx.send(msg).await.is_err()
        {
            trace!(uid = %self.uid, "outbound queue closed, dropping message");
        }
    }

    /// Send a PRIVMSG to this user from `from`.
    pub async fn privmsg_from(&self, from: &User, text: &str) {
        let msg = Message {
            tags: None,
            prefix: Some(from.prefix()),
            command: Command::PRIVMSG(self.nick(), text.to_string()),
        };
        self.send(msg).await;
    }

    /// Drop the outbound queue; the writer task ends once it drains.
    pub fn close(&self) {
        self.outbound.lock().take();
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.lock().is_some()
    }
}
