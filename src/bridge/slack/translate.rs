//! Slack RTM events to [`BridgeEvent`]s.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::api::{ItemEvent, ReactionEvent, SlackApi, SlackEvent, SlackMessage};
use super::users::SlackUsers;
use crate::bridge::text::{self, Attachment, FileUpload, MessageParts};
use crate::bridge::{BridgeEvent, UserInfo};
use crate::error::BridgeError;
use crate::state::{EchoIds, PendingEchoes};

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([UWB][A-Z0-9]+)(?:\|([^>]*))?>").expect("valid regex"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#([CGD][A-Z0-9]+)(?:\|([^>]*))?>").expect("valid regex"));
static SPECIAL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!(here|channel|everyone)(?:\|[^>]*)?>").expect("valid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([a-z][a-z0-9+.-]*:[^|>]+)(?:\|([^>]*))?>").expect("valid regex"));

/// Translates one login's RTM stream.
pub struct SlackTranslator {
    api: Arc<dyn SlackApi>,
    users: Arc<SlackUsers>,
    echoes: Arc<PendingEchoes>,
}

impl SlackTranslator {
    pub fn new(api: Arc<dyn SlackApi>, users: Arc<SlackUsers>, echoes: Arc<PendingEchoes>) -> Self {
        Self { api, users, echoes }
    }

    /// Drain `rx` until the RTM reader or the relay goes away.
    pub async fn run(self, mut rx: mpsc::Receiver<SlackEvent>, events: mpsc::Sender<BridgeEvent>) {
        while let Some(event) = rx.recv().await {
            for out in self.translate(event).await {
                if events.send(out).await.is_err() {
                    debug!("bridge event queue closed, stopping slack translator");
                    return;
                }
            }
        }
        debug!("slack event stream drained");
    }

    /// Translate one RTM event. Events that cannot be resolved yield nothing.
    pub async fn translate(&self, event: SlackEvent) -> Vec<BridgeEvent> {
        let result = match event {
            SlackEvent::Message(msg) => self.message(msg).await,
            SlackEvent::MemberJoinedChannel {
                user,
                channel,
                inviter,
            } => self.member_joined(&user, &channel, &inviter).await,
            SlackEvent::MemberLeftChannel { user, channel } => {
                self.users.get(&user).await.map(|removed| {
                    vec![BridgeEvent::ChannelRemove {
                        channel_id: channel,
                        removed: vec![removed],
                    }]
                })
            }
            SlackEvent::ChannelJoined { channel } => self.me().await.map(|me| {
                vec![BridgeEvent::ChannelAdd {
                    channel_id: channel.id,
                    added: vec![me],
                    adder: None,
                }]
            }),
            SlackEvent::ChannelLeft { channel } => self.me().await.map(|me| {
                vec![BridgeEvent::ChannelRemove {
                    channel_id: channel,
                    removed: vec![me],
                }]
            }),
            SlackEvent::ReactionAdded(ev) => self.reaction(ev, "Added").await,
            SlackEvent::ReactionRemoved(ev) => self.reaction(ev, "Removed").await,
            SlackEvent::StarAdded(ev) => self.item(ev, "starred").await,
            SlackEvent::StarRemoved(ev) => self.item(ev, "unstarred").await,
            SlackEvent::PinAdded(ev) => self.item(ev, "pinned").await,
            SlackEvent::PinRemoved(ev) => self.item(ev, "unpinned").await,
            SlackEvent::Goodbye => {
                debug!("slack rtm goodbye");
                Ok(Vec::new())
            }
            SlackEvent::Disconnected => {
                debug!("slack rtm disconnected");
                Ok(Vec::new())
            }
            SlackEvent::Unknown => Ok(Vec::new()),
        };

        result.unwrap_or_else(|e| {
            warn!(error = %e, "dropping slack event");
            Vec::new()
        })
    }

    async fn me(&self) -> Result<UserInfo, BridgeError> {
        self.users.get(self.users.me_id()).await
    }

    async fn message(&self, msg: SlackMessage) -> Result<Vec<BridgeEvent>, BridgeError> {
        match msg.subtype.as_str() {
            "channel_join" | "channel_leave" | "group_join" | "group_leave" => {
                return Ok(Vec::new());
            }
            "channel_topic" | "group_topic" => {
                let sender = self.users.get(&msg.user).await?;
                return Ok(vec![BridgeEvent::ChannelTopic {
                    channel_id: msg.channel,
                    sender,
                    text: msg.topic,
                }]);
            }
            _ => {}
        }

        if !msg.user.is_empty()
            && msg.user == self.users.me_id()
            && self
                .echoes
                .suppress(&msg.channel, &msg.ts, EchoIds::Timestamp)
                .await
        {
            trace!(channel = %msg.channel, ts = %msg.ts, "suppressed own echo");
            return Ok(Vec::new());
        }

        let (sender, lines) = match msg.subtype.as_str() {
            "message_deleted" => (
                self.users.slackbot(),
                vec![text::deleted_line(&msg.deleted_ts)],
            ),
            "message_changed" => {
                let Some(inner) = msg.message.as_deref() else {
                    return Ok(Vec::new());
                };
                let sender = self
                    .users
                    .sender(&inner.user, &inner.bot_id, &inner.username)
                    .await?;
                (sender, render(inner, Some(&inner.ts)))
            }
            _ => {
                let sender = self
                    .users
                    .sender(&msg.user, &msg.bot_id, &msg.username)
                    .await?;
                (sender, render(&msg, None))
            }
        };

        let mut texts = Vec::with_capacity(lines.len());
        for line in lines {
            texts.push(self.cleanup(&line).await);
        }
        self.route(&msg.channel, sender, texts).await
    }

    async fn member_joined(
        &self,
        user: &str,
        channel: &str,
        inviter: &str,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let added = self.users.get(user).await?;
        let adder = if inviter.is_empty() {
            None
        } else {
            self.users.get(inviter).await.ok()
        };
        Ok(vec![BridgeEvent::ChannelAdd {
            channel_id: channel.to_string(),
            added: vec![added],
            adder,
        }])
    }

    async fn reaction(
        &self,
        ev: ReactionEvent,
        verb: &str,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let target = self.api.message_at(&ev.item.channel, &ev.item.ts).await?;
        if target.is_none() {
            debug!(channel = %ev.item.channel, ts = %ev.item.ts, "reaction target not found");
            return Ok(Vec::new());
        }
        let sender = self.users.get(&ev.user).await?;
        let line = format!(
            "{} {verb} reaction :{}:",
            text::message_marker(&ev.item.ts),
            ev.reaction
        );
        self.route(&ev.item.channel, sender, vec![line]).await
    }

    async fn item(&self, ev: ItemEvent, action: &str) -> Result<Vec<BridgeEvent>, BridgeError> {
        let Some(message) = ev.item.message else {
            return Ok(Vec::new());
        };
        let sender = self.users.get(&ev.user).await?;
        let body = self.cleanup(&message.text).await;
        let line = format!(
            "{} Message {action} ({body})",
            text::message_marker(&message.ts)
        );
        self.route(&ev.item.channel, sender, vec![line]).await
    }

    /// Wrap lines as channel or direct messages depending on the conversation.
    async fn route(
        &self,
        channel_id: &str,
        sender: UserInfo,
        lines: Vec<String>,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        if !channel_id.starts_with('D') {
            return Ok(lines
                .into_iter()
                .map(|text| BridgeEvent::ChannelMessage {
                    channel_id: channel_id.to_string(),
                    sender: sender.clone(),
                    text,
                })
                .collect());
        }

        let receiver = if sender.me {
            self.dm_partner(channel_id).await?
        } else {
            self.me().await?
        };
        Ok(lines
            .into_iter()
            .map(|text| BridgeEvent::DirectMessage {
                sender: sender.clone(),
                receiver: receiver.clone(),
                text,
            })
            .collect())
    }

    async fn dm_partner(&self, channel_id: &str) -> Result<UserInfo, BridgeError> {
        let members = self.api.conversation_members(channel_id).await?;
        let partner = members
            .iter()
            .find(|m| m.as_str() != self.users.me_id())
            .ok_or_else(|| BridgeError::NotFound(format!("partner in {channel_id}")))?;
        self.users.get(partner).await
    }

    /// Replace Slack markup with plain text.
    async fn cleanup(&self, line: &str) -> String {
        let unlabeled: Vec<String> = USER_MENTION
            .captures_iter(line)
            .filter(|caps| caps.get(2).is_none_or(|m| m.as_str().is_empty()))
            .map(|caps| caps[1].to_string())
            .collect();

        let mut nicks = HashMap::new();
        for id in unlabeled {
            if nicks.contains_key(&id) {
                continue;
            }
            let nick = match self.users.get(&id).await {
                Ok(info) => info.nick,
                Err(_) => id.clone(),
            };
            nicks.insert(id, nick);
        }
        cleanup_markup(line, &nicks)
    }
}

fn render(msg: &SlackMessage, edited_ts: Option<&str>) -> Vec<String> {
    let attachments: Vec<Attachment> = msg
        .attachments
        .iter()
        .map(|a| Attachment {
            pretext: a.pretext.clone(),
            text: a.text.clone(),
        })
        .collect();
    let files: Vec<FileUpload> = msg
        .files
        .iter()
        .map(|f| FileUpload {
            mode: f.mode.clone(),
            name: f.name.clone(),
            title: f.title.clone(),
            filetype: f.filetype.clone(),
            url: f.url_private.clone(),
        })
        .collect();
    let thread_ts = (!msg.thread_ts.is_empty() && msg.thread_ts != msg.ts)
        .then_some(msg.thread_ts.as_str());

    text::render(&MessageParts {
        body: &msg.text,
        attachments: &attachments,
        files: &files,
        thread_ts,
        edited_ts,
    })
}

/// Rewrite mentions and links. `nicks` maps user ids without an inline label
/// to their resolved nick.
fn cleanup_markup(line: &str, nicks: &HashMap<String, String>) -> String {
    let line = USER_MENTION.replace_all(line, |caps: &Captures<'_>| {
        match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
            Some(label) => format!("@{label}"),
            None => format!("@{}", nicks.get(&caps[1]).map_or(&caps[1], String::as_str)),
        }
    });
    let line = CHANNEL_MENTION.replace_all(&line, |caps: &Captures<'_>| {
        match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
            Some(name) => format!("#{name}"),
            None => format!("#{}", &caps[1]),
        }
    });
    let line = SPECIAL_MENTION.replace_all(&line, "@$1");
    let line = LINK.replace_all(&line, |caps: &Captures<'_>| {
        match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
            Some(label) if label != &caps[1] => format!("{label} ({})", &caps[1]),
            _ => caps[1].to_string(),
        }
    });
    line.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
