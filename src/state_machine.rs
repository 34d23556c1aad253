//! Session state machine
//!
//! Every inbound event runs one turn: load the session, dispatch the event
//! to the handlers of the current state and of `ALL`, deliver the effects
//! the handlers queued, then persist the session again.

mod effect;
pub mod event;
pub mod name;
mod state;
mod turn;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, RenderMode};
pub use event::{Attachment, AttachmentKind, CallbackQuery, Command, Event, EventKind, IncomingMessage};
pub use name::{StateError, ALL, CURRENT, DEFAULT};
pub use state::{Filter, Handler, HandlerResult, State};
pub use turn::{Flow, HandlerError, Turn};

use crate::config::MachineConfig;
use crate::runtime::{self, DeliveryFailure, Transport};
use crate::session::{Data, SessionKey};
use crate::store::{SessionStore, StoredSession};
use std::collections::HashMap;

/// Result of one processed event
#[derive(Debug)]
pub struct TurnOutcome {
    pub key: SessionKey,
    /// State the session was left in
    pub state: String,
    /// Session data as persisted
    pub data: Data,
    /// Message carried by an abort, if a handler stopped dispatch
    pub notice: Option<String>,
    /// Effects the transport accepted, in order
    pub delivered: Vec<Effect>,
    pub failures: Vec<DeliveryFailure>,
    /// Number of handlers that returned an error
    pub handler_errors: usize,
    /// Loaded or outgoing data was unusable and the session was reset
    pub reset: bool,
    /// The session store accepted the save
    pub persisted: bool,
}

struct Dispatch {
    abort: Option<Option<String>>,
    errors: usize,
}

/// Registry of named states plus the per-turn cycle
pub struct StateMachine<S> {
    store: S,
    config: MachineConfig,
    states: HashMap<String, State>,
    default: State,
    all: State,
}

impl<S: SessionStore> StateMachine<S> {
    pub fn new(store: S, config: MachineConfig) -> Self {
        Self {
            store,
            config,
            states: HashMap::new(),
            default: State::new(DEFAULT),
            all: State::new(ALL),
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a state. Malformed, reserved and duplicate names are rejected.
    pub fn register(&mut self, state: State) -> Result<&mut State, StateError> {
        name::validate(state.name())?;
        if self.states.contains_key(state.name()) {
            return Err(StateError::AlreadyRegistered(state.name().to_string()));
        }
        tracing::debug!(state = %state.name(), handlers = state.len(), "Registered state");
        let name = state.name().to_string();
        Ok(self.states.entry(name).or_insert(state))
    }

    /// Look up a state; `DEFAULT` and `ALL` resolve to the built-in ones
    pub fn state(&self, name: &str) -> Option<&State> {
        match name {
            DEFAULT => Some(&self.default),
            ALL => Some(&self.all),
            _ => self.states.get(name),
        }
    }

    pub fn state_mut(&mut self, name: &str) -> Option<&mut State> {
        match name {
            DEFAULT => Some(&mut self.default),
            ALL => Some(&mut self.all),
            _ => self.states.get_mut(name),
        }
    }

    pub fn default_state_mut(&mut self) -> &mut State {
        &mut self.default
    }

    pub fn all_state_mut(&mut self) -> &mut State {
        &mut self.all
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Run one turn for `event`, delivering its effects through `transport`.
    ///
    /// Never fails: unusable session data resets the session, handler and
    /// transport errors are logged and reported in the outcome.
    pub fn process(&self, event: &Event, transport: &dyn Transport) -> TurnOutcome {
        let key = event.key;
        let _span = tracing::info_span!("turn", chat_id = key.chat_id, user_id = key.user_id).entered();
        let _lease = self.store.lease(&key);

        let stored = match self.store.load(&key) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(session = %key, error = %e, "Failed to load session, skipping turn");
                return self.skipped_turn(event, transport);
            }
        };

        let (state, data, reset) = self.restore(&key, stored);
        tracing::info!(session = %key, state = %state, "Loaded session");

        let mut turn = Turn::bound(key, state, data, &self.config, &self.states);
        let dispatch = self.dispatch(&mut turn, event);
        let notice = dispatch.abort.clone().flatten();

        if let Some(query) = event.callback_query() {
            if !turn.effects().iter().any(Effect::is_answer) {
                let (text, alert) = self.acknowledgement(&dispatch);
                turn.push_effect(Effect::answer(&query.query_id, Some(text), alert));
            }
        } else if let Some(message) = &notice {
            turn.reply(message.clone());
        }

        let effects = turn.take_effects();
        let delivery = runtime::deliver(&key, effects, &mut turn.data, transport);

        let (mut state, mut data) = turn.into_parts();
        let mut reset = reset;
        let value = match serde_json::to_value(&data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(session = %key, error = %e, "Failed to serialize session, resetting");
                state = DEFAULT.to_string();
                data = Data::new();
                reset = true;
                serde_json::to_value(&data).unwrap_or_default()
            }
        };

        let persisted = match self.store.save(&key, Some(&state), Some(&value)) {
            Ok(()) => {
                tracing::info!(session = %key, state = %state, "Saved session");
                true
            }
            Err(e) => {
                tracing::error!(session = %key, error = %e, "Failed to save session");
                false
            }
        };

        TurnOutcome {
            key,
            state,
            data,
            notice,
            delivered: delivery.delivered,
            failures: delivery.failures,
            handler_errors: dispatch.errors,
            reset,
            persisted,
        }
    }

    /// Turn the stored record into a state and data, resetting on anything
    /// unusable
    fn restore(&self, key: &SessionKey, stored: StoredSession) -> (String, Data, bool) {
        let state = stored.state.unwrap_or_else(|| DEFAULT.to_string());
        let data = match stored.data {
            None => Ok(Data::new()),
            Some(value) => serde_json::from_value::<Data>(value),
        };

        match data {
            Ok(_) if state != DEFAULT && !self.states.contains_key(&state) => {
                tracing::warn!(session = %key, state = %state, "Stored state is not registered, resetting to DEFAULT");
                (DEFAULT.to_string(), Data::new(), true)
            }
            Ok(data) => match data.history.iter().find(|id| !self.states.contains_key(id.as_str())) {
                Some(stale) => {
                    tracing::warn!(session = %key, menu = %stale, "History names an unregistered state, resetting to DEFAULT");
                    (DEFAULT.to_string(), Data::new(), true)
                }
                None => (state, data, false),
            },
            Err(e) => {
                tracing::warn!(session = %key, error = %e, "Stored session data is corrupt, resetting to DEFAULT");
                (DEFAULT.to_string(), Data::new(), true)
            }
        }
    }

    fn dispatch(&self, turn: &mut Turn<'_>, event: &Event) -> Dispatch {
        let current = self.state(turn.state()).unwrap_or(&self.default);
        let bot_username = self.config.bot_username.as_deref();
        let mut errors = 0;

        for state in [current, &self.all] {
            for handler in state.handlers_for(event, bot_username) {
                match handler(&mut *turn, event) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Abort(message)) => {
                        tracing::debug!(session = %turn.key(), state = %state.name(), "Dispatch aborted");
                        return Dispatch {
                            abort: Some(message),
                            errors,
                        };
                    }
                    Err(e) => {
                        tracing::error!(session = %turn.key(), state = %state.name(), error = %e, "Handler failed");
                        errors += 1;
                    }
                }
            }
        }

        Dispatch {
            abort: None,
            errors,
        }
    }

    /// Answer text for a button press nobody answered explicitly
    fn acknowledgement(&self, dispatch: &Dispatch) -> (String, bool) {
        let notices = &self.config.notices;
        match &dispatch.abort {
            Some(Some(message)) => (message.clone(), true),
            Some(None) => (notices.callback_ok.clone(), false),
            None if dispatch.errors > 0 => (notices.handler_failed.clone(), true),
            None => (notices.action_not_found.clone(), true),
        }
    }

    fn skipped_turn(&self, event: &Event, transport: &dyn Transport) -> TurnOutcome {
        let key = event.key;
        let mut data = Data::new();
        let effects = event
            .callback_query()
            .map(|query| {
                Effect::answer(
                    &query.query_id,
                    Some(self.config.notices.handler_failed.clone()),
                    true,
                )
            })
            .into_iter()
            .collect();
        let delivery = runtime::deliver(&key, effects, &mut data, transport);

        TurnOutcome {
            key,
            state: DEFAULT.to_string(),
            data,
            notice: None,
            delivered: delivery.delivered,
            failures: delivery.failures,
            handler_errors: 0,
            reset: false,
            persisted: false,
        }
    }
}
