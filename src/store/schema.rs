//! Database schema for the SQLite session store

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    session_key TEXT PRIMARY KEY,
    chat_id INTEGER,
    user_id INTEGER,
    state TEXT,
    data TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);
";

pub const SELECT_SESSION: &str =
    "SELECT state, data FROM sessions WHERE session_key = ?1";

pub const SELECT_UPDATED_AT: &str =
    "SELECT updated_at FROM sessions WHERE session_key = ?1";

pub const UPSERT_SESSION: &str = "
INSERT INTO sessions (session_key, chat_id, user_id, state, data, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(session_key) DO UPDATE SET
    state = excluded.state,
    data = excluded.data,
    updated_at = excluded.updated_at
";
