//! chatflow - conversational sessions with menu navigation
//!
//! A per-conversation state machine that loads a session, dispatches an
//! inbound event to the handlers of its current state, delivers the
//! resulting messages through a transport and persists the session again.
//! On top sits a declarative menu system: paginated button grids, checkbox
//! and radio selection, free-text and file capture, with back/done/cancel
//! history semantics and a compact callback token for inline buttons.

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod callback;
pub mod config;
pub mod menu;
pub mod navigation;
pub mod resolve;
pub mod runtime;
pub mod session;
pub mod state_machine;
pub mod store;

pub use callback::{CallbackData, CallbackError, CallbackType};
pub use config::{ConsoleConfig, MachineConfig};
pub use menu::{MenuDefinition, MenuError, MenuRegistry, NavButton};
pub use navigation::{NavError, Navigator};
pub use resolve::Resolvable;
pub use runtime::{Transport, TransportError};
pub use session::{Data, MenuData, SessionKey};
pub use state_machine::{Event, Flow, HandlerError, State, StateMachine, Turn, TurnOutcome};
pub use store::{MemoryStore, SessionStore, SqliteStore};
