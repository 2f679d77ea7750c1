//! Flattening backend messages into IRC lines.

use chrono::{DateTime, Utc};

/// Attachment body rows shown before truncating.
pub const ATTACHMENT_LINE_CAP: usize = 6;

/// Replaces the attachment rows beyond [`ATTACHMENT_LINE_CAP`].
pub const TRUNCATION_MARKER: &str = "> ...";

/// Rich attachment of a backend message.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub pretext: String,
    pub text: String,
}

/// A file shared with a message.
#[derive(Debug, Clone, Default)]
pub struct FileUpload {
    pub mode: String,
    pub name: String,
    pub title: String,
    pub filetype: String,
    pub url: String,
}

impl FileUpload {
    pub fn describe(&self) -> String {
        format!(
            "Uploaded {} {} / {} ({}): {}",
            self.mode, self.name, self.title, self.filetype, self.url
        )
    }
}

/// Format a backend timestamp as `hh:mm:ss` UTC.
///
/// Accepts Slack `seconds.micros` strings and Mattermost millisecond
/// integers; anything else is returned unchanged.
pub fn format_ts(ts: &str) -> String {
    let parsed = if ts.contains('.') {
        ts.parse::<f64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0))
    } else {
        ts.parse::<i64>().ok().and_then(|n| {
            // millisecond epochs are 13 digits for the foreseeable future
            if n > 100_000_000_000 {
                DateTime::<Utc>::from_timestamp_millis(n)
            } else {
                DateTime::<Utc>::from_timestamp(n, 0)
            }
        })
    };
    match parsed {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// `[M hh:mm:ss]` reference to another message.
pub fn message_marker(ts: &str) -> String {
    format!("[M {}]", format_ts(ts))
}

/// Lines of one attachment: pretext as-is, then up to
/// [`ATTACHMENT_LINE_CAP`] body rows quoted with `> `.
pub fn attachment_lines(attachment: &Attachment) -> Vec<String> {
    let mut lines = Vec::new();
    if !attachment.pretext.is_empty() {
        lines.extend(attachment.pretext.split('\n').map(str::to_string));
    }
    if attachment.text.is_empty() {
        return lines;
    }

    let rows: Vec<&str> = attachment.text.split('\n').collect();
    lines.extend(
        rows.iter()
            .take(ATTACHMENT_LINE_CAP)
            .map(|row| format!("> {row}")),
    );
    if rows.len() > ATTACHMENT_LINE_CAP {
        lines.push(TRUNCATION_MARKER.to_string());
    }
    lines
}

/// A backend message broken down into the parts that become IRC lines.
#[derive(Debug, Clone, Default)]
pub struct MessageParts<'a> {
    pub body: &'a str,
    pub attachments: &'a [Attachment],
    pub files: &'a [FileUpload],
    /// Timestamp of the thread root, if the message is a reply.
    pub thread_ts: Option<&'a str>,
    /// Timestamp of the original message, if this is an edit.
    pub edited_ts: Option<&'a str>,
}

/// Flatten a message into ordered plain-text lines.
///
/// Body lines come first, then attachments, then file uploads. The thread
/// and edit markers go on the first line only, edit marker outermost.
pub fn render(parts: &MessageParts<'_>) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    if !parts.body.is_empty() {
        lines.extend(parts.body.split('\n').map(str::to_string));
    }
    for attachment in parts.attachments {
        lines.extend(attachment_lines(attachment));
    }
    lines.extend(parts.files.iter().map(FileUpload::describe));

    if let Some(first) = lines.first_mut() {
        if let Some(ts) = parts.thread_ts {
            *first = format!("[T {}] {first}", format_ts(ts));
        }
        if let Some(ts) = parts.edited_ts {
            *first = format!("[C {}] {first}", format_ts(ts));
        }
    }
    lines
}

/// The single line shown for a deleted message.
pub fn deleted_line(deleted_ts: &str) -> String {
    format!("{} Message deleted", message_marker(deleted_ts))
}
