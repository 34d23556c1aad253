//! State names and their validation

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Resting state of a session with no active menu
pub const DEFAULT: &str = "DEFAULT";
/// Reference to whatever state is active
pub const CURRENT: &str = "CURRENT";
/// Pseudo-state whose handlers see every event
pub const ALL: &str = "ALL";

pub const RESERVED: [&str; 3] = [DEFAULT, CURRENT, ALL];

static STATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("state name pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid state name: {0:?}")]
    InvalidStateName(String),
    #[error("State already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Unknown state: {0}")]
    UnknownState(String),
}

/// Whether `name` has the shape of a state name (reserved names included)
pub fn is_well_formed(name: &str) -> bool {
    STATE_NAME.is_match(name)
}

/// Check a name for use by a registered state
pub fn validate(name: &str) -> Result<(), StateError> {
    if !is_well_formed(name) || RESERVED.contains(&name) {
        return Err(StateError::InvalidStateName(name.to_string()));
    }
    Ok(())
}
