//! Declarative menus
//!
//! A menu is an immutable [`MenuDefinition`] registered once in a
//! [`MenuRegistry`]. Menus refer to each other by id only; the registry
//! resolves ids at render and dispatch time. Installing the registry into a
//! state machine registers one state per menu, named after the menu id.

mod button;
mod definition;
mod parse;
mod registry;
mod render;

pub use button::{GotoButton, HistoryKind, MenuEntry, NavButton, SelectableButton, Selection};
pub use definition::{MenuDefinition, MenuKind};
pub use parse::{parse_text, ParseError, TextKind};
pub use registry::MenuRegistry;
pub use render::{escape_html, keyboard, paginate, pagination_row, InlineButton, Markup, OutgoingMessage, PageWindow};

pub(crate) use definition::default_radio;

use crate::callback::CallbackError;
use crate::resolve::ResolveError;
use crate::state_machine::StateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Invalid menu id {0:?}, menu ids must be valid state names")]
    InvalidId(String),
    #[error("Menu registered twice: {0}")]
    DuplicateMenu(String),
    #[error("Unknown menu: {0}")]
    UnknownMenu(String),
    #[error("Menu {menu} links to unknown menu {target}")]
    UnknownTarget { menu: String, target: String },
    #[error("Menu {0} has more than one radio button selected by default")]
    MultipleRadioDefaults(String),
    #[error("Button callback of menu does not fit: {0}")]
    Callback(#[from] CallbackError),
    #[error("Menu field could not be resolved: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Menu state could not be registered: {0}")]
    State(#[from] StateError),
}
