//! SQLite session store

use super::schema::{SCHEMA, SELECT_SESSION, SELECT_UPDATED_AT, UPSERT_SESSION};
use super::{LeaseTable, SessionLease, SessionStore, StoreError, StoreResult, StoredSession};
use crate::session::SessionKey;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe SQLite handle, one row per session key
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    leases: Arc<LeaseTable>,
}

impl SqliteStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            leases: LeaseTable::new(),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// When the session was last saved
    pub fn updated_at(&self, key: &SessionKey) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(SELECT_UPDATED_AT, params![key.storage_key()], |row| row.get(0))
            .optional()?;
        Ok(raw.map(|s| parse_datetime(&s)))
    }

    /// Overwrite the raw data column, bypassing serialization
    pub fn write_raw(&self, key: &SessionKey, state: Option<&str>, data: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            UPSERT_SESSION,
            params![
                key.storage_key(),
                key.chat_id,
                key.user_id,
                state,
                data,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn load(&self, key: &SessionKey) -> StoreResult<StoredSession> {
        let conn = self.conn()?;
        let row: Option<(Option<String>, Option<String>)> = conn
            .query_row(SELECT_SESSION, params![key.storage_key()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((state, raw)) = row else {
            tracing::debug!(session = %key, "No stored session");
            return Ok(StoredSession::default());
        };

        // Unparseable text is handed on as a JSON string, so the state
        // machine's corruption policy resets the session instead of failing
        // every future turn.
        let data = raw.map(|text| {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(session = %key, error = %e, "Stored session data is not valid JSON");
                Value::String(text)
            })
        });

        Ok(StoredSession { state, data })
    }

    fn save(&self, key: &SessionKey, state: Option<&str>, data: Option<&Value>) -> StoreResult<()> {
        let text = data.map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;
        conn.execute(
            UPSERT_SESSION,
            params![
                key.storage_key(),
                key.chat_id,
                key.user_id,
                state,
                text,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn lease(&self, key: &SessionKey) -> SessionLease {
        self.leases.acquire(*key)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store.load(&SessionKey::private(5)).unwrap();
        assert_eq!(stored, StoredSession::default());
        assert!(store.updated_at(&SessionKey::private(5)).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        let key = SessionKey::new(Some(-1001), Some(42));

        store.save(&key, Some("FIRST"), Some(&json!({"history": ["A"]}))).unwrap();
        store.save(&key, Some("SECOND"), Some(&json!({"history": ["B"]}))).unwrap();

        let stored = store.load(&key).unwrap();
        assert_eq!(stored.state.as_deref(), Some("SECOND"));
        assert_eq!(stored.data, Some(json!({"history": ["B"]})));
        assert!(store.updated_at(&key).unwrap().is_some());
    }

    #[test]
    fn test_null_state_and_data() {
        let store = SqliteStore::open_in_memory().unwrap();
        let key = SessionKey::new(None, Some(42));
        store.save(&key, None, None).unwrap();
        assert_eq!(store.load(&key).unwrap(), StoredSession::default());
    }

    #[test]
    fn test_corrupt_json_is_passed_through() {
        let store = SqliteStore::open_in_memory().unwrap();
        let key = SessionKey::private(9);
        store.write_raw(&key, Some("MAIN"), "{not json").unwrap();

        let stored = store.load(&key).unwrap();
        assert_eq!(stored.state.as_deref(), Some("MAIN"));
        assert_eq!(stored.data, Some(Value::String("{not json".to_string())));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let key = SessionKey::private(77);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&key, Some("MAIN"), Some(&json!({"saved_data": {"A": true}}))).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let stored = store.load(&key).unwrap();
        assert_eq!(stored.state.as_deref(), Some("MAIN"));
        assert_eq!(stored.data, Some(json!({"saved_data": {"A": true}})));
    }
}
