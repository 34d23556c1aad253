//! Inbound events of a conversation

use crate::session::{MessageId, SessionKey};

/// One inbound update, addressed to a session
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub key: SessionKey,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A chat message (text, media or both)
    Message(IncomingMessage),
    /// An inline button press
    Callback(CallbackQuery),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackQuery {
    /// Transport id used to answer the press
    pub query_id: String,
    /// The encoded callback token
    pub data: String,
    /// Message the pressed button belongs to
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Document,
    Photo,
    Audio,
    Video,
    Voice,
    Animation,
    Sticker,
}

/// A file reference carried by a message. Photos arrive as one attachment
/// per available size.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_id: String,
    pub file_size: Option<u64>,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
            file_size: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }
}

/// A `/command` split into name and arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: &'a str,
    pub args: Option<&'a str>,
}

impl Event {
    pub fn text(key: SessionKey, text: impl Into<String>) -> Self {
        Self {
            key,
            kind: EventKind::Message(IncomingMessage {
                text: Some(text.into()),
                ..IncomingMessage::default()
            }),
        }
    }

    pub fn attachment(key: SessionKey, attachment: Attachment) -> Self {
        Self {
            key,
            kind: EventKind::Message(IncomingMessage {
                attachments: vec![attachment],
                ..IncomingMessage::default()
            }),
        }
    }

    pub fn callback(
        key: SessionKey,
        query_id: impl Into<String>,
        data: impl Into<String>,
        message_id: Option<MessageId>,
    ) -> Self {
        Self {
            key,
            kind: EventKind::Callback(CallbackQuery {
                query_id: query_id.into(),
                data: data.into(),
                message_id,
            }),
        }
    }

    pub fn message(&self) -> Option<&IncomingMessage> {
        match &self.kind {
            EventKind::Message(msg) => Some(msg),
            EventKind::Callback(_) => None,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            EventKind::Callback(query) => Some(query),
            EventKind::Message(_) => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.kind, EventKind::Callback(_))
    }
}

impl IncomingMessage {
    /// Parse the text as a command.
    ///
    /// `/name@bot args` is only recognized when `bot` equals `bot_username`
    /// (case-insensitive); without a configured username any suffix matches.
    pub fn command(&self, bot_username: Option<&str>) -> Option<Command<'_>> {
        let text = self.text.as_deref()?.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, Some(args.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        let name = match head.split_once('@') {
            Some((name, target)) => {
                if let Some(username) = bot_username {
                    if !target.eq_ignore_ascii_case(username) {
                        return None;
                    }
                }
                name
            }
            None => head,
        };
        if name.is_empty() {
            return None;
        }
        Some(Command { name, args })
    }

    /// Non-command text
    pub fn plain_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|text| !text.trim_start().starts_with('/'))
    }

    /// Best attachment of the given kind: the largest photo, otherwise the
    /// first match
    pub fn attachment(&self, kind: AttachmentKind) -> Option<&Attachment> {
        let mut matching = self.attachments.iter().filter(|a| a.kind == kind);
        if kind == AttachmentKind::Photo {
            matching.max_by_key(|a| a.file_size.unwrap_or(0))
        } else {
            matching.next()
        }
    }
}
