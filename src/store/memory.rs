//! In-memory session store

use super::{LeaseTable, SessionLease, SessionStore, StoreError, StoreResult, StoredSession};
use crate::session::SessionKey;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keeps sessions in a process-local map. Cloning shares the map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<Mutex<HashMap<SessionKey, StoredSession>>>,
    leases: Arc<LeaseTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a raw record in place, bypassing the state machine
    pub fn insert_raw(&self, key: SessionKey, state: Option<&str>, data: Option<Value>) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(
                key,
                StoredSession {
                    state: state.map(String::from),
                    data,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &SessionKey) -> StoreResult<StoredSession> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        let stored = sessions.get(key).cloned().unwrap_or_default();
        tracing::debug!(session = %key, state = ?stored.state, "Loaded session from memory");
        Ok(stored)
    }

    fn save(&self, key: &SessionKey, state: Option<&str>, data: Option<&Value>) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(
            *key,
            StoredSession {
                state: state.map(String::from),
                data: data.cloned(),
            },
        );
        tracing::debug!(session = %key, state = ?state, "Stored session in memory");
        Ok(())
    }

    fn lease(&self, key: &SessionKey) -> SessionLease {
        self.leases.acquire(*key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_session_is_empty() {
        let store = MemoryStore::new();
        let stored = store.load(&SessionKey::private(1)).unwrap();
        assert_eq!(stored, StoredSession::default());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let key = SessionKey::new(Some(10), Some(20));
        let data = json!({"menus": {}, "history": [], "saved_data": {}});
        store.save(&key, Some("MAIN"), Some(&data)).unwrap();

        let stored = store.load(&key).unwrap();
        assert_eq!(stored.state.as_deref(), Some("MAIN"));
        assert_eq!(stored.data, Some(data));
        assert!(store.load(&SessionKey::new(Some(10), None)).unwrap().state.is_none());
    }

    #[test]
    fn test_clones_share_sessions() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.insert_raw(SessionKey::private(3), Some("X"), None);
        assert_eq!(store.len(), 1);
    }
}
