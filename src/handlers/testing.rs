//! Shared fixtures for handler tests.

use irc_proto::Message;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::Context;
use crate::bridge::testing::{FakeBridge, FakeConnector};
use crate::bridge::{Bridge, ChannelInfo, UserInfo};
use crate::config::Config;
use crate::state::{Server, Shared};

/// A registered user `alice` on a fresh server, not logged in.
pub fn setup() -> (Context, mpsc::Receiver<Message>) {
    setup_with(Arc::new(FakeConnector::default()))
}

pub fn setup_with(connector: Arc<FakeConnector>) -> (Context, mpsc::Receiver<Message>) {
    let server = Server::new(Shared::new(Config::default(), connector));
    let (tx, rx) = mpsc::channel(512);
    let user = server.new_local_user("localhost".into(), tx);
    user.set_nick("alice");
    user.set_registration("alice", "Alice");
    assert!(server.add(&user));
    server.set_local_user(Some(user.clone()));
    (Context { server, user }, rx)
}

/// As [`setup`], logged in to a fake backend with channel `C1` (`general`)
/// whose other member is `bob` (`U2`).
pub fn logged_in() -> (Context, mpsc::Receiver<Message>, Arc<FakeBridge>) {
    let (ctx, rx) = setup();
    let bridge = Arc::new(FakeBridge::new("U1", "alice"));
    bridge.add_channel(ChannelInfo {
        id: "C1".into(),
        name: "general".into(),
        topic: "all hands".into(),
        ..Default::default()
    });
    bridge.add_member("C1", bob());
    ctx.user.set_backend_identity(&bridge.get_me());
    ctx.user.set_bridge(bridge.clone());
    (ctx, rx, bridge)
}

pub fn bob() -> UserInfo {
    UserInfo {
        id: "U2".into(),
        nick: "bob".into(),
        user: "U2".into(),
        host: "fake".into(),
        ghost: true,
        ..Default::default()
    }
}

pub fn line(raw: &str) -> Message {
    raw.parse().expect("valid IRC line")
}

pub fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}
