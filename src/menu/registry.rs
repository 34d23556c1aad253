//! Central lookup of menu definitions by id

use super::button::{GotoButton, HistoryKind, MenuEntry, NavButton};
use super::definition::{MenuDefinition, MenuKind};
use super::render::{render_menu, OutgoingMessage};
use super::{default_radio, MenuError};
use crate::navigation::{NavError, Navigator};
use crate::session::Data;
use crate::state_machine::{name, Flow, State, StateMachine, Turn};
use crate::store::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;

/// All menus of a bot. Built at startup, then shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct MenuRegistry {
    menus: HashMap<String, MenuDefinition>,
    order: Vec<String>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a menu. Its id must be a valid, unused state name.
    pub fn add(&mut self, menu: MenuDefinition) -> Result<&mut Self, MenuError> {
        let id = menu.id().to_string();
        if name::validate(&id).is_err() {
            return Err(MenuError::InvalidId(id));
        }
        if self.menus.contains_key(&id) {
            return Err(MenuError::DuplicateMenu(id));
        }
        self.order.push(id.clone());
        self.menus.insert(id, menu);
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Result<&MenuDefinition, MenuError> {
        self.menus
            .get(id)
            .ok_or_else(|| MenuError::UnknownMenu(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.menus.contains_key(id)
    }

    /// Menu ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// Check everything that can be checked before the first session:
    /// literal links point at registered menus, literal buttons encode
    /// within the callback size limit and radio menus have at most one
    /// default.
    pub fn validate(&self) -> Result<(), MenuError> {
        for id in &self.order {
            let menu = self.get(id)?;

            let mut gotos: Vec<GotoButton> = Vec::new();
            for kind in HistoryKind::ALL {
                if let Some(Some(button)) = nav_literal(menu, kind) {
                    button.callback().encode()?;
                    if let NavButton::Goto(goto) = button {
                        gotos.push(goto.clone());
                    }
                }
            }
            match menu.kind() {
                MenuKind::Goto { menus } => {
                    if let Some(entries) = menus.as_literal() {
                        gotos.extend(entries.iter().cloned().map(MenuEntry::into_button));
                    }
                }
                MenuKind::Checkbox { checkboxes: buttons } | MenuKind::Radio { radiobuttons: buttons } => {
                    if let Some(buttons) = buttons.as_literal() {
                        let selection = menu.selection().unwrap_or(super::Selection::Checkbox);
                        for button in buttons {
                            button.callback(selection).encode()?;
                        }
                        if matches!(menu.kind(), MenuKind::Radio { .. }) {
                            default_radio(id, buttons)?;
                        }
                    }
                }
                MenuKind::Text(_) | MenuKind::Upload(_) | MenuKind::Send => {}
            }

            for goto in gotos {
                if !self.contains(&goto.menu) {
                    return Err(MenuError::UnknownTarget {
                        menu: id.clone(),
                        target: goto.menu,
                    });
                }
                goto.callback().encode()?;
            }
        }
        Ok(())
    }

    /// Label for a button leading to `id`: the menu's title, else its id
    pub fn label_for(&self, id: &str, data: &Data) -> Result<String, MenuError> {
        let menu = self.get(id)?;
        Ok(menu
            .title(data)?
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| id.to_string()))
    }

    /// Render a menu for the given session data
    pub fn render(&self, id: &str, data: &Data, page_size: usize, done: bool) -> Result<OutgoingMessage, MenuError> {
        render_menu(self, self.get(id)?, data, page_size, done)
    }

    /// Activate a menu and post it as a new message
    pub fn show(&self, turn: &mut Turn<'_>, id: &str) -> Result<(), NavError> {
        Navigator::new(self).show(turn, id)
    }

    /// Validate the registry and register one state per menu, with the
    /// handlers its kind needs. Hosts can add more handlers through
    /// [`StateMachine::state_mut`] afterwards.
    pub fn install<S: SessionStore>(self: &Arc<Self>, machine: &mut StateMachine<S>) -> Result<(), MenuError> {
        self.validate()?;
        for id in &self.order {
            let menu = self.get(id)?;
            let mut state = State::new(id.clone());
            let registry = Arc::clone(self);
            let menu_id = id.clone();

            match menu.kind() {
                MenuKind::Goto { .. } | MenuKind::Checkbox { .. } | MenuKind::Radio { .. } => {
                    state.on_callback(move |turn, event| match event.callback_query() {
                        Some(query) => Ok(Navigator::new(&registry).handle_callback(turn, &menu_id, query)?),
                        None => Ok(Flow::Continue),
                    });
                }
                MenuKind::Text(_) => {
                    state.on_message(move |turn, event| match event.message() {
                        Some(message) => Ok(Navigator::new(&registry).capture_text(turn, &menu_id, message)?),
                        None => Ok(Flow::Continue),
                    });
                }
                MenuKind::Upload(_) => {
                    state.on_message(move |turn, event| match event.message() {
                        Some(message) => Ok(Navigator::new(&registry).capture_upload(turn, &menu_id, message)?),
                        None => Ok(Flow::Continue),
                    });
                }
                MenuKind::Send => {
                    state.on_message(move |turn, event| match event.message() {
                        Some(message) => Ok(Navigator::new(&registry).handle_command(turn, &menu_id, message)?),
                        None => Ok(Flow::Continue),
                    });
                }
            }

            machine.register(state)?;
            tracing::debug!(menu = %id, "Installed menu");
        }
        tracing::info!(menus = self.len(), "Menu registry installed");
        Ok(())
    }
}

fn nav_literal(menu: &MenuDefinition, kind: HistoryKind) -> Option<&Option<NavButton>> {
    menu.nav_slot(kind).as_literal()
}
