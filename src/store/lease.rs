//! Per-session turn exclusivity

use crate::session::SessionKey;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Set of sessions currently inside a turn
#[derive(Debug, Default)]
pub struct LeaseTable {
    held: Mutex<HashSet<SessionKey>>,
    released: Condvar,
}

impl LeaseTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until no other turn holds `key`, then hold it
    pub fn acquire(self: &Arc<Self>, key: SessionKey) -> SessionLease {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key);
        SessionLease {
            table: Some(Arc::clone(self)),
            key,
        }
    }

    pub fn is_held(&self, key: &SessionKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Exclusive claim on one session, released on drop
#[derive(Debug)]
pub struct SessionLease {
    table: Option<Arc<LeaseTable>>,
    key: SessionKey,
}

impl SessionLease {
    /// A lease that excludes nothing, for drivers with their own locking
    pub fn unlocked(key: SessionKey) -> Self {
        Self { table: None, key }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some(table) = self.table.take() {
            let mut held = table.held.lock().unwrap_or_else(PoisonError::into_inner);
            held.remove(&self.key);
            drop(held);
            table.released.notify_all();
        }
    }
}
