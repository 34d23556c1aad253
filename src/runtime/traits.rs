//! Trait abstractions for message delivery
//!
//! The state machine never talks to a chat platform itself; hosts plug in a
//! [`Transport`] and tests use the recording mock.

use crate::menu::OutgoingMessage;
use crate::session::{MessageId, SessionKey};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The message to edit no longer exists or can't be edited
    #[error("Message {0} can not be edited")]
    MessageGone(MessageId),
    #[error("Session {0} has no chat to send to")]
    NoChat(SessionKey),
    #[error("Transport failed: {0}")]
    Failed(String),
}

/// Delivers messages of a session to its chat
pub trait Transport: Send + Sync {
    /// Post a new message, returning its id
    fn send(&self, key: &SessionKey, message: &OutgoingMessage) -> Result<MessageId, TransportError>;

    /// Replace text and keyboard of an existing message, returning the id
    /// the message has afterwards
    fn edit(
        &self,
        key: &SessionKey,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError>;

    /// Answer a button press, optionally with a notice
    fn answer_callback(&self, query_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, key: &SessionKey, message: &OutgoingMessage) -> Result<MessageId, TransportError> {
        (**self).send(key, message)
    }

    fn edit(
        &self,
        key: &SessionKey,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        (**self).edit(key, message_id, message)
    }

    fn answer_callback(&self, query_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        (**self).answer_callback(query_id, text, alert)
    }
}
