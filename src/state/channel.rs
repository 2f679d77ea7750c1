//! Channels: a backend channel (or a local-only one) and its members.

use irc_proto::{Command, Message, Response};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::user::User;
use crate::bridge::Service;
use crate::handlers::server_reply;

/// Maximum bytes of nicks packed into one RPL_NAMREPLY.
const NAMES_CHUNK: usize = 400;

/// Channel topic.
#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub text: String,
    /// Nick that last set the topic, empty when it came from channel metadata.
    pub set_by: String,
}

/// Channel modes. Membership and topic are owned by the backend, so only
/// informational modes exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelModes {
    /// +p
    pub private: bool,
    /// +n
    pub no_external: bool,
}

impl ChannelModes {
    pub fn as_mode_string(&self) -> String {
        let mut s = String::from("+");
        if self.no_external {
            s.push('n');
        }
        if self.private {
            s.push('p');
        }
        s
    }
}

pub struct Channel {
    id: String,
    name: String,
    /// `None` for channels that exist only on this server.
    service: Option<Service>,
    server_name: String,
    topic: RwLock<Topic>,
    modes: ChannelModes,
    /// Members keyed by uid.
    members: RwLock<HashMap<String, Arc<User>>>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Channel {
    pub fn new(
        id: String,
        name: String,
        service: Option<Service>,
        server_name: String,
        topic: String,
        private: bool,
    ) -> Self {
        Self {
            id,
            name,
            service,
            server_name,
            topic: RwLock::new(Topic {
                text: topic,
                set_by: String::new(),
            }),
            modes: ChannelModes {
                private,
                no_external: true,
            },
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// IRC-visible name, including the `#`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> Option<Service> {
        self.service
    }

    /// Whether the channel has a backend counterpart.
    pub fn is_bridged(&self) -> bool {
        self.service.is_some()
    }

    pub fn modes(&self) -> ChannelModes {
        self.modes
    }

    pub fn topic(&self) -> Topic {
        self.topic.read().clone()
    }

    pub fn has_member(&self, user: &User) -> bool {
        self.members.read().contains_key(&user.uid)
    }

    pub fn members(&self) -> Vec<Arc<User>> {
        self.members.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Add a member without telling anyone. Returns false if already present.
    pub fn add_member(&self, user: &Arc<User>) -> bool {
        let inserted = self
            .members
            .write()
            .insert(user.uid.clone(), user.clone())
            .is_none();
        if inserted {
            user.add_channel(&self.id);
        }
        inserted
    }

    /// Remove a member without telling anyone. Returns false if absent.
    pub fn remove_member(&self, user: &User) -> bool {
        let removed = self.members.write().remove(&user.uid).is_some();
        if removed {
            user.remove_channel(&self.id);
        }
        removed
    }

    /// Join `user`, announce it to the members and, for a connected user,
    /// send the topic and names burst.
    pub async fn join(&self, user: &Arc<User>) -> bool {
        if !self.add_member(user) {
            return false;
        }

        let join = Message {
            tags: None,
            prefix: Some(user.prefix()),
            command: Command::JOIN(self.name.clone(), None, None),
        };
        self.broadcast(join, None).await;

        if user.is_connected() {
            self.send_topic(user).await;
            self.send_names(user).await;
        }
        true
    }

    /// Announce and remove a member.
    pub async fn part(&self, user: &User, reason: Option<&str>) -> bool {
        if !self.has_member(user) {
            return false;
        }
        let part = Message {
            tags: None,
            prefix: Some(user.prefix()),
            command: Command::PART(self.name.clone(), reason.map(str::to_string)),
        };
        self.broadcast(part, None).await;
        self.remove_member(user)
    }

    /// Deliver to every member except `except_uid`.
    pub async fn broadcast(&self, msg: Message, except_uid: Option<&str>) {
        for member in self.members() {
            if except_uid == Some(member.uid.as_str()) {
                continue;
            }
            member.send(msg.clone()).await;
        }
    }

    /// Deliver a PRIVMSG from `from` to every other member.
    pub async fn message(&self, from: &User, text: &str) {
        let msg = Message {
            tags: None,
            prefix: Some(from.prefix()),
            command: Command::PRIVMSG(self.name.clone(), text.to_string()),
        };
        self.broadcast(msg, Some(&from.uid)).await;
    }

    /// Store a new topic and announce it as set by `by`.
    pub async fn set_topic(&self, by: &User, text: &str) {
        {
            let mut topic = self.topic.write();
            topic.text = text.to_string();
            topic.set_by = by.nick();
        }
        let msg = Message {
            tags: None,
            prefix: Some(by.prefix()),
            command: Command::TOPIC(self.name.clone(), Some(text.to_string())),
        };
        self.broadcast(msg, None).await;
    }

    pub async fn send_topic(&self, to: &User) {
        let topic = self.topic();
        let reply = if topic.text.is_empty() {
            server_reply(
                &self.server_name,
                Response::RPL_NOTOPIC,
                vec![to.nick(), self.name.clone(), "No topic is set".to_string()],
            )
        } else {
            server_reply(
                &self.server_name,
                Response::RPL_TOPIC,
                vec![to.nick(), self.name.clone(), topic.text],
            )
        };
        to.send(reply).await;
    }

    pub async fn send_names(&self, to: &User) {
        let nick = to.nick();
        let symbol = if self.modes.private { "*" } else { "=" };

        let mut nicks: Vec<String> = self.members().iter().map(|m| m.nick()).collect();
        nicks.sort();

        let mut line = String::new();
        for member in nicks {
            if !line.is_empty() && line.len() + member.len() + 1 > NAMES_CHUNK {
                to.send(server_reply(
                    &self.server_name,
                    Response::RPL_NAMREPLY,
                    vec![
                        nick.clone(),
                        symbol.to_string(),
                        self.name.clone(),
                        std::mem::take(&mut line),
                    ],
                ))
                .await;
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&member);
        }
        if !line.is_empty() {
            to.send(server_reply(
                &self.server_name,
                Response::RPL_NAMREPLY,
                vec![nick.clone(), symbol.to_string(), self.name.clone(), line],
            ))
            .await;
        }

        to.send(server_reply(
            &self.server_name,
            Response::RPL_ENDOFNAMES,
            vec![nick, self.name.clone(), "End of /NAMES list".to_string()],
        ))
        .await;
    }
}
