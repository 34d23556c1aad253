//! Runtime configuration

/// User-visible texts the engine produces on its own
#[derive(Debug, Clone)]
pub struct Notices {
    /// Shown when a button press cannot be decoded or is not handled
    pub action_not_found: String,
    /// Shown when a handler failed while processing a button press
    pub handler_failed: String,
    /// Acknowledgement for a handled button press
    pub callback_ok: String,
    /// Default validation message for text menus
    pub parse_failure: String,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            action_not_found: "Could not find the action you have clicked.".to_string(),
            handler_failed: "Something did fail. Sorry.".to_string(),
            callback_ok: "OK".to_string(),
            parse_failure: "Could not parse.".to_string(),
        }
    }
}

/// Configuration shared by the state machine and the menu engine
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Bot username; commands written as `/cmd@name` only match this name
    pub bot_username: Option<String>,
    /// Content buttons per page
    pub page_size: usize,
    pub notices: Notices,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            bot_username: None,
            page_size: DEFAULT_PAGE_SIZE,
            notices: Notices::default(),
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

impl MachineConfig {
    pub fn from_env() -> Self {
        Self {
            bot_username: std::env::var("CHATFLOW_BOT_USERNAME")
                .ok()
                .map(|name| name.trim_start_matches('@').to_string())
                .filter(|name| !name.is_empty()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_bot_username(mut self, name: impl Into<String>) -> Self {
        self.bot_username = Some(name.into());
        self
    }
}

/// Where the demo binary keeps its sessions and how it logs
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    /// SQLite database path; in-memory sessions when unset
    pub db_path: Option<String>,
    /// Emit JSON log lines instead of human readable ones
    pub log_json: bool,
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("CHATFLOW_DB_PATH").ok().filter(|p| !p.is_empty()),
            log_json: std::env::var("CHATFLOW_LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}
