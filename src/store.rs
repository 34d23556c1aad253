//! Session persistence
//!
//! The state machine only needs `load` at the start of a turn and `save` at
//! its end. Drivers are responsible for keeping two turns of the same session
//! from interleaving, which the bundled drivers do through [`LeaseTable`].

mod lease;
mod memory;
mod schema;
mod sqlite;

pub use lease::{LeaseTable, SessionLease};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::session::SessionKey;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Session store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw persisted record of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSession {
    /// `None` for an unknown session, which starts in `DEFAULT`
    pub state: Option<String>,
    pub data: Option<Value>,
}

/// Storage contract for session records
pub trait SessionStore: Send + Sync {
    /// Load a session; unknown keys yield an empty record
    fn load(&self, key: &SessionKey) -> StoreResult<StoredSession>;

    /// Persist a session, replacing whatever was stored before
    fn save(&self, key: &SessionKey, state: Option<&str>, data: Option<&Value>) -> StoreResult<()>;

    /// Claim exclusive use of a session for the duration of one turn
    fn lease(&self, key: &SessionKey) -> SessionLease {
        SessionLease::unlocked(*key)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn load(&self, key: &SessionKey) -> StoreResult<StoredSession> {
        (**self).load(key)
    }

    fn save(&self, key: &SessionKey, state: Option<&str>, data: Option<&Value>) -> StoreResult<()> {
        (**self).save(key, state, data)
    }

    fn lease(&self, key: &SessionKey) -> SessionLease {
        (**self).lease(key)
    }
}
