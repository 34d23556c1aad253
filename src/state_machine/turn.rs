//! Per-event working context handed to handlers

use super::effect::Effect;
use super::name::{self, StateError, DEFAULT};
use super::state::State;
use crate::callback::CallbackError;
use crate::config::MachineConfig;
use crate::menu::MenuError;
use crate::navigation::NavError;
use crate::resolve::ResolveError;
use crate::session::{Data, SessionKey};
use std::collections::HashMap;
use thiserror::Error;

/// What the dispatcher does after a handler returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep dispatching to the remaining handlers
    Continue,
    /// Stop dispatching. The data is still persisted and the message, if
    /// any, is shown to the user.
    Abort(Option<String>),
}

impl Flow {
    pub fn abort() -> Self {
        Flow::Abort(None)
    }

    pub fn abort_with(message: impl Into<String>) -> Self {
        Flow::Abort(Some(message.into()))
    }
}

/// A handler failure. Logged by the dispatcher, never fatal to the turn.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// The mutable view of one session during one turn
pub struct Turn<'a> {
    key: SessionKey,
    state: String,
    pub data: Data,
    effects: Vec<Effect>,
    config: &'a MachineConfig,
    states: Option<&'a HashMap<String, State>>,
}

impl<'a> Turn<'a> {
    /// A turn not bound to a state machine: any well-formed state name can
    /// be entered.
    pub fn new(key: SessionKey, state: impl Into<String>, data: Data, config: &'a MachineConfig) -> Self {
        Self {
            key,
            state: state.into(),
            data,
            effects: Vec::new(),
            config,
            states: None,
        }
    }

    pub(crate) fn bound(
        key: SessionKey,
        state: String,
        data: Data,
        config: &'a MachineConfig,
        states: &'a HashMap<String, State>,
    ) -> Self {
        Self {
            key,
            state,
            data,
            effects: Vec::new(),
            config,
            states: Some(states),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn config(&self) -> &MachineConfig {
        self.config
    }

    /// Switch the session to another state. `DEFAULT` is always allowed,
    /// other names must be registered.
    pub fn set_state(&mut self, name: &str) -> Result<(), StateError> {
        if name != DEFAULT {
            match self.states {
                Some(states) if !states.contains_key(name) => {
                    return Err(StateError::UnknownState(name.to_string()));
                }
                Some(_) => {}
                None => name::validate(name)?,
            }
        }
        if self.state != name {
            tracing::debug!(session = %self.key, from = %self.state, to = %name, "State switch");
            self.state = name.to_string();
        }
        Ok(())
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Queue a plain text message to the session's chat
    pub fn reply(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::reply(text));
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn into_parts(self) -> (String, Data) {
        (self.state, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_turn_accepts_wellformed_names() {
        let config = MachineConfig::default();
        let mut turn = Turn::new(SessionKey::private(1), DEFAULT, Data::new(), &config);
        turn.set_state("MAIN").unwrap();
        assert_eq!(turn.state(), "MAIN");
        assert!(turn.set_state("main").is_err());
        assert!(turn.set_state("ALL").is_err());
        turn.set_state(DEFAULT).unwrap();
        assert_eq!(turn.state(), DEFAULT);
    }

    #[test]
    fn test_bound_turn_rejects_unregistered() {
        let config = MachineConfig::default();
        let mut states = HashMap::new();
        states.insert("MAIN".to_string(), State::new("MAIN"));
        let mut turn = Turn::bound(
            SessionKey::private(1),
            DEFAULT.to_string(),
            Data::new(),
            &config,
            &states,
        );
        turn.set_state("MAIN").unwrap();
        assert_eq!(
            turn.set_state("OTHER"),
            Err(StateError::UnknownState("OTHER".to_string()))
        );
        assert_eq!(turn.state(), "MAIN");
    }

    #[test]
    fn test_reply_queues_effect() {
        let config = MachineConfig::default();
        let mut turn = Turn::new(SessionKey::private(1), DEFAULT, Data::new(), &config);
        turn.reply("hi");
        assert_eq!(turn.effects(), &[Effect::reply("hi")]);
    }
}
