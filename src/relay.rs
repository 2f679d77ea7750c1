//! Applies translated backend events to one connection's registry.
//!
//! One relay task runs per backend login. It is the only consumer of the
//! login's event queue, so events take effect in the order the backend sent
//! them.

use irc_proto::{Command, Message};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bridge::{Bridge, BridgeEvent, UserInfo};
use crate::state::{Server, User};

/// Drain `events` until the bridge goes away or logs out.
///
/// `bridge` is the session feeding `events`. A Logout from it tears the
/// session down only while it is still the user's current bridge.
pub async fn run(
    server: Arc<Server>,
    user: Arc<User>,
    bridge: Weak<dyn Bridge>,
    mut events: mpsc::Receiver<BridgeEvent>,
) {
    while let Some(event) = events.recv().await {
        if matches!(event, BridgeEvent::Logout) {
            if owns_session(&user, &bridge) {
                info!(nick = %user.nick(), "backend ended the session");
                server.logout(&user).await;
            }
            break;
        }
        apply(&server, &user, event).await;
    }
    debug!(nick = %user.nick(), "relay stopped");
}

fn owns_session(user: &User, bridge: &Weak<dyn Bridge>) -> bool {
    user.bridge()
        .is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(&current), bridge.as_ptr()))
}

/// Whether `info` is the account `user` is logged in as.
fn is_local(user: &User, info: &UserInfo) -> bool {
    info.me || (!info.id.is_empty() && info.id == user.backend_id())
}

/// PRIVMSG shown to the local user as if it had sent it itself.
fn own_message(user: &User, target: String, text: String) -> Message {
    Message {
        tags: None,
        prefix: Some(user.prefix()),
        command: Command::PRIVMSG(target, text),
    }
}

pub async fn apply(server: &Arc<Server>, user: &Arc<User>, event: BridgeEvent) {
    match event {
        BridgeEvent::ChannelMessage {
            channel_id,
            sender,
            text,
        } => {
            let ch = server.channel(&channel_id).await;
            if !ch.has_member(user) {
                ch.join(user).await;
            }
            if is_local(user, &sender) {
                user.send(own_message(user, ch.name().to_string(), text))
                    .await;
                return;
            }
            let ghost = server.ghost(&sender);
            if !ch.has_member(&ghost) {
                ch.join(&ghost).await;
            }
            ch.message(&ghost, &text).await;
        }

        BridgeEvent::DirectMessage {
            sender,
            receiver,
            text,
        } => {
            if is_local(user, &sender) {
                let peer = server.ghost(&receiver);
                user.send(own_message(user, peer.nick(), text)).await;
            } else {
                let ghost = server.ghost(&sender);
                user.privmsg_from(&ghost, &text).await;
            }
        }

        BridgeEvent::ChannelAdd {
            channel_id,
            added,
            adder,
        } => {
            let ch = server.channel(&channel_id).await;
            for info in added {
                if is_local(user, &info) {
                    if let Some(adder) = &adder {
                        debug!(channel = %ch.name(), by = %adder.nick, "added to channel");
                    }
                    ch.join(user).await;
                } else {
                    ch.join(&server.ghost(&info)).await;
                }
            }
        }

        BridgeEvent::ChannelRemove {
            channel_id,
            removed,
        } => {
            let Some(ch) = server.has_channel(&channel_id) else {
                debug!(channel = %channel_id, "removal from unknown channel");
                return;
            };
            for info in removed {
                if is_local(user, &info) {
                    server.part_channel(user, &ch, None).await;
                } else if let Some(ghost) = server.has_user_id(&info.id) {
                    server.part_channel(&ghost, &ch, None).await;
                }
            }
        }

        BridgeEvent::ChannelTopic {
            channel_id,
            sender,
            text,
        } => {
            let ch = server.channel(&channel_id).await;
            if is_local(user, &sender) {
                ch.set_topic(user, &text).await;
            } else {
                ch.set_topic(&server.ghost(&sender), &text).await;
            }
        }

        // ends the relay loop in `run`
        BridgeEvent::Logout => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{FakeBridge, FakeConnector};
    use crate::bridge::ChannelInfo;
    use crate::config::Config;
    use crate::state::Shared;
    use irc_proto::Prefix;

    fn setup() -> (Arc<Server>, Arc<User>, mpsc::Receiver<Message>) {
        let server = Server::new(Shared::new(
            Config::default(),
            Arc::new(FakeConnector::default()),
        ));
        let (tx, rx) = mpsc::channel(512);
        let user = server.new_local_user("localhost".into(), tx);
        user.set_nick("alice");
        user.set_registration("alice", "Alice");
        assert!(server.add(&user));

        let bridge = Arc::new(FakeBridge::new("U1", "alice"));
        bridge.add_channel(ChannelInfo {
            id: "C1".into(),
            name: "general".into(),
            ..Default::default()
        });
        user.set_backend_identity(&bridge.get_me());
        user.set_bridge(bridge);
        server.set_local_user(Some(user.clone()));
        (server, user, rx)
    }

    fn bob() -> UserInfo {
        UserInfo {
            id: "U2".into(),
            nick: "bob".into(),
            user: "U2".into(),
            host: "example".into(),
            ghost: true,
            ..Default::default()
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_message_auto_joins_user_and_sender() {
        let (server, user, mut rx) = setup();
        apply(
            &server,
            &user,
            BridgeEvent::ChannelMessage {
                channel_id: "C1".into(),
                sender: bob(),
                text: "hello there".into(),
            },
        )
        .await;

        let ch = server.has_channel("#general").unwrap();
        assert!(ch.has_member(&user));
        let ghost = server.has_user_id("U2").unwrap();
        assert!(ch.has_member(&ghost));

        let out = drain(&mut rx);
        let last = out.last().unwrap();
        assert_eq!(last.prefix, Some(Prefix::Nickname("bob".into(), "U2".into(), "example".into())));
        assert_eq!(
            last.command,
            Command::PRIVMSG("#general".into(), "hello there".into())
        );
    }

    #[tokio::test]
    async fn test_own_message_from_elsewhere_uses_local_prefix() {
        let (server, user, mut rx) = setup();
        let ch = server.channel("C1").await;
        ch.join(&user).await;
        drain(&mut rx);

        let me = UserInfo {
            id: "U1".into(),
            nick: "alice".into(),
            me: true,
            ..Default::default()
        };
        apply(
            &server,
            &user,
            BridgeEvent::ChannelMessage {
                channel_id: "C1".into(),
                sender: me,
                text: "sent from phone".into(),
            },
        )
        .await;

        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].prefix, Some(user.prefix()));
        // no ghost for our own account
        assert!(server.has_user_id("U1").is_some_and(|u| Arc::ptr_eq(&u, &user)));
    }

    #[tokio::test]
    async fn test_direct_message_from_ghost() {
        let (server, user, mut rx) = setup();
        let me = user.info();
        apply(
            &server,
            &user,
            BridgeEvent::DirectMessage {
                sender: bob(),
                receiver: UserInfo { me: true, ..me },
                text: "psst over here".into(),
            },
        )
        .await;
        let out = drain(&mut rx);
        assert_eq!(
            out[0].command,
            Command::PRIVMSG("alice".into(), "psst over here".into())
        );
    }

    #[tokio::test]
    async fn test_removal_of_local_user_parts_and_discards() {
        let (server, user, mut rx) = setup();
        apply(
            &server,
            &user,
            BridgeEvent::ChannelAdd {
                channel_id: "C1".into(),
                added: vec![user.info()],
                adder: Some(bob()),
            },
        )
        .await;
        assert!(server.has_channel("C1").unwrap().has_member(&user));
        drain(&mut rx);

        apply(
            &server,
            &user,
            BridgeEvent::ChannelRemove {
                channel_id: "C1".into(),
                removed: vec![user.info()],
            },
        )
        .await;
        let out = drain(&mut rx);
        assert!(matches!(out[0].command, Command::PART(ref chan, _) if chan == "#general"));
        assert!(server.has_channel("C1").is_none());
    }

    #[tokio::test]
    async fn test_topic_from_ghost() {
        let (server, user, mut rx) = setup();
        server.channel("C1").await.join(&user).await;
        drain(&mut rx);

        apply(
            &server,
            &user,
            BridgeEvent::ChannelTopic {
                channel_id: "C1".into(),
                sender: bob(),
                text: "release day".into(),
            },
        )
        .await;
        let ch = server.has_channel("C1").unwrap();
        assert_eq!(ch.topic().text, "release day");
        assert_eq!(ch.topic().set_by, "bob");
        let out = drain(&mut rx);
        assert_eq!(
            out[0].command,
            Command::TOPIC("#general".into(), Some("release day".into()))
        );
    }

    #[tokio::test]
    async fn test_logout_event_stops_relay() {
        let (server, user, _rx) = setup();
        server.channel("C1").await.join(&user).await;
        let bridge = user.bridge().unwrap();
        let (tx, events) = mpsc::channel(8);
        let relay = tokio::spawn(run(
            server.clone(),
            user.clone(),
            Arc::downgrade(&bridge),
            events,
        ));

        tx.send(BridgeEvent::Logout).await.unwrap();
        relay.await.unwrap();
        assert!(user.bridge().is_none());
        assert!(server.has_channel("C1").is_none());
        // still connected
        assert!(user.is_connected());
    }

    #[tokio::test]
    async fn test_stale_logout_leaves_new_session_alone() {
        let (server, user, _rx) = setup();
        server.channel("C1").await.join(&user).await;
        let old: Arc<dyn Bridge> = Arc::new(FakeBridge::new("U1", "alice"));
        let (tx, events) = mpsc::channel(8);
        let relay = tokio::spawn(run(
            server.clone(),
            user.clone(),
            Arc::downgrade(&old),
            events,
        ));

        tx.send(BridgeEvent::Logout).await.unwrap();
        relay.await.unwrap();
        assert!(user.bridge().is_some());
        assert!(server.has_channel("C1").is_some());
    }
}
