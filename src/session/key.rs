//! Session key: the (chat, user) pair a conversation belongs to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one conversation participant.
///
/// Either half may be absent: channel posts carry no user, inline queries
/// carry no chat. The pair as a whole must stay stable for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub chat_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl SessionKey {
    pub fn new(chat_id: Option<i64>, user_id: Option<i64>) -> Self {
        Self { chat_id, user_id }
    }

    /// Key for a private chat, where chat and user share the same id
    pub fn private(id: i64) -> Self {
        Self::new(Some(id), Some(id))
    }

    /// Stable textual form used as primary key by storage drivers
    pub fn storage_key(&self) -> String {
        fn part(id: Option<i64>) -> String {
            id.map_or_else(|| "-".to_string(), |id| id.to_string())
        }
        format!("{}:{}", part(self.chat_id), part(self.user_id))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
