//! Helper functions shared by handlers.

use irc_proto::{Command, Message, Prefix};

/// Helper to create a server reply message (numeric response).
pub fn server_reply(server_name: &str, response: irc_proto::Response, params: Vec<String>) -> Message {
    Message {
        tags: None,
        prefix: Some(Prefix::ServerName(server_name.to_string())),
        command: Command::Response(response, params),
    }
}

/// Upper-case command name of a parsed message.
///
/// Commands `irc-proto` could not type (wrong arity, unknown verbs) arrive as
/// `Command::Raw` and keep their original name.
pub fn command_name(command: &Command) -> String {
    match command {
        Command::Raw(name, _) => name.to_ascii_uppercase(),
        other => String::from(other)
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase(),
    }
}

/// Split a comma-separated target list, skipping empty entries.
pub fn parse_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

pub fn is_channel_name(name: &str) -> bool {
    name.starts_with('#') || name.starts_with('&')
}

/// Body of a CTCP ACTION (`/me`), if `text` is one.
pub fn ctcp_action(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('\x01')?;
    let inner = inner.strip_suffix('\x01').unwrap_or(inner);
    inner.strip_prefix("ACTION ")
}

/// Whether `text` is a CTCP request of any kind.
pub fn is_ctcp(text: &str) -> bool {
    text.starts_with('\x01')
}
