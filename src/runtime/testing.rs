//! Mock implementations for testing
//!
//! These mocks let the state machine and the menu engine run whole turns
//! without a chat platform or a database.

use super::traits::{Transport, TransportError};
use crate::menu::OutgoingMessage;
use crate::session::{MessageId, SessionKey};
use crate::store::{SessionLease, SessionStore, StoreError, StoreResult, StoredSession};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Recording Transport
// ============================================================================

/// One call made against the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Send {
        key: SessionKey,
        message_id: MessageId,
        message: OutgoingMessage,
    },
    Edit {
        key: SessionKey,
        message_id: MessageId,
        message: OutgoingMessage,
    },
    Answer {
        query_id: String,
        text: Option<String>,
        alert: bool,
    },
}

/// Transport that records every call and hands out sequential message ids
#[allow(dead_code)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    next_id: Mutex<MessageId>,
    gone: Mutex<HashSet<MessageId>>,
    fail_sends: Mutex<bool>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            gone: Mutex::new(HashSet::new()),
            fail_sends: Mutex::new(false),
        }
    }

    /// Make edits of `message_id` fail as if the message was deleted
    pub fn forget(&self, message_id: MessageId) {
        self.gone.lock().unwrap().insert(message_id);
    }

    /// Make every send fail
    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Texts of all sent messages, in order
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Send { message, .. } => Some(message.text),
                _ => None,
            })
            .collect()
    }

    /// Content of the latest send or edit
    pub fn last_message(&self) -> Option<OutgoingMessage> {
        self.calls().into_iter().rev().find_map(|call| match call {
            TransportCall::Send { message, .. } | TransportCall::Edit { message, .. } => Some(message),
            TransportCall::Answer { .. } => None,
        })
    }

    /// Answers given to button presses as `(text, alert)`
    pub fn answers(&self) -> Vec<(Option<String>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Answer { text, alert, .. } => Some((text, alert)),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, key: &SessionKey, message: &OutgoingMessage) -> Result<MessageId, TransportError> {
        if *self.fail_sends.lock().unwrap() {
            return Err(TransportError::Failed("send disabled".to_string()));
        }
        let mut next = self.next_id.lock().unwrap();
        let message_id = *next;
        *next += 1;
        self.calls.lock().unwrap().push(TransportCall::Send {
            key: *key,
            message_id,
            message: message.clone(),
        });
        Ok(message_id)
    }

    fn edit(
        &self,
        key: &SessionKey,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        self.calls.lock().unwrap().push(TransportCall::Edit {
            key: *key,
            message_id,
            message: message.clone(),
        });
        if self.gone.lock().unwrap().contains(&message_id) {
            return Err(TransportError::MessageGone(message_id));
        }
        Ok(message_id)
    }

    fn answer_callback(&self, query_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(TransportCall::Answer {
            query_id: query_id.to_string(),
            text: text.map(str::to_string),
            alert,
        });
        Ok(())
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Session store whose load or save always fails
#[allow(dead_code)]
pub struct FailingStore {
    fail_load: bool,
    fail_save: bool,
    saves: AtomicUsize,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            fail_save: false,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn failing_save() -> Self {
        Self {
            fail_load: false,
            fail_save: true,
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of save attempts
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SessionStore for FailingStore {
    fn load(&self, _key: &SessionKey) -> StoreResult<StoredSession> {
        if self.fail_load {
            return Err(StoreError::Poisoned);
        }
        Ok(StoredSession::default())
    }

    fn save(&self, _key: &SessionKey, _state: Option<&str>, _data: Option<&Value>) -> StoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(StoreError::Poisoned);
        }
        Ok(())
    }

    fn lease(&self, key: &SessionKey) -> SessionLease {
        SessionLease::unlocked(*key)
    }
}
