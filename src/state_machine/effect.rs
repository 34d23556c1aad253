//! Effects produced while handling an event

use crate::menu::OutgoingMessage;
use crate::session::MessageId;

/// How a rendered menu reaches the chat
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMode {
    /// Post a new message
    Send,
    /// Replace the content of an existing message.
    ///
    /// `reuse` names the menu whose message is taken over when a menu opens
    /// in place of another one. Without a known message this becomes a send.
    Edit {
        message_id: Option<MessageId>,
        reuse: Option<String>,
    },
    /// Strip the keyboard from a message the session moved away from.
    /// Failure is tolerated.
    Finalize { message_id: Option<MessageId> },
}

/// Effects to be delivered after dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show a menu
    Render {
        menu: String,
        mode: RenderMode,
        message: OutgoingMessage,
    },

    /// Plain text answer to the session's chat
    Reply { text: String },

    /// Answer a button press
    AnswerCallback {
        query_id: String,
        text: Option<String>,
        alert: bool,
    },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }

    pub fn answer(query_id: impl Into<String>, text: Option<String>, alert: bool) -> Self {
        Effect::AnswerCallback {
            query_id: query_id.into(),
            text,
            alert,
        }
    }

    pub fn menu(&self) -> Option<&str> {
        match self {
            Effect::Render { menu, .. } => Some(menu),
            _ => None,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Effect::AnswerCallback { .. })
    }
}
