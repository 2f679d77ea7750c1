//! Backend events after translation.

use super::UserInfo;

/// One backend occurrence, already translated into IRC terms.
///
/// Multi-line messages arrive as one event per line, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A line posted to a backend channel.
    ChannelMessage {
        channel_id: String,
        sender: UserInfo,
        text: String,
    },
    /// A line in a one-to-one conversation.
    DirectMessage {
        sender: UserInfo,
        receiver: UserInfo,
        text: String,
    },
    /// Users joined (or were added to) a channel.
    ChannelAdd {
        channel_id: String,
        added: Vec<UserInfo>,
        adder: Option<UserInfo>,
    },
    /// Users left (or were removed from) a channel.
    ChannelRemove {
        channel_id: String,
        removed: Vec<UserInfo>,
    },
    ChannelTopic {
        channel_id: String,
        sender: UserInfo,
        text: String,
    },
    /// The backend session ended.
    Logout,
}
