//! Menu navigation
//!
//! The [`Navigator`] moves a session between menus: activation, history
//! steps with their save policies, switching with either an in-place edit or
//! a finalised old message plus a new one, and the callback and input flows
//! of the individual menu kinds. It only mutates the turn's data and queues
//! render effects; delivery happens after dispatch.

#[cfg(test)]
mod proptests;

use crate::callback::{self, CallbackType};
use crate::menu::{
    parse_text, paginate, HistoryKind, MenuDefinition, MenuError, MenuKind, MenuRegistry, NavButton,
    OutgoingMessage, SelectableButton, Selection,
};
use crate::resolve::ResolveError;
use crate::session::{MenuData, MessageId};
use crate::state_machine::{CallbackQuery, Effect, Flow, IncomingMessage, RenderMode, StateError, Turn, DEFAULT};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("No menu is active")]
    NoActiveMenu,
    #[error("Menu {0} is not in the history")]
    NotInHistory(String),
    #[error("History steps must be negative, got {0}")]
    ForwardHistory(i64),
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// The menu a session is moving away from, captured before its data is
/// saved or discarded
struct Leaving {
    menu: String,
    message_id: Option<MessageId>,
    force_reply: bool,
    /// Final form of its message, without keyboard
    done: OutgoingMessage,
}

/// Navigation over the menus of one registry
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'r> {
    registry: &'r MenuRegistry,
}

impl<'r> Navigator<'r> {
    pub fn new(registry: &'r MenuRegistry) -> Self {
        Self { registry }
    }

    /// Make `id` the current menu.
    ///
    /// The session enters the menu's state and the menu's data is seeded on
    /// first activation. With `add_history` unset the id is pushed unless it
    /// already is on top; `Some(true)` always pushes, `Some(false)` never.
    pub fn activate(&self, turn: &mut Turn<'_>, id: &str, add_history: Option<bool>) -> Result<(), NavError> {
        let menu = self.registry.get(id)?;
        turn.set_state(id)?;
        seed(turn, menu)?;
        let push = add_history.unwrap_or_else(|| turn.data.current_menu() != Some(id));
        if push {
            turn.data.history.push(id.to_string());
        }
        tracing::debug!(session = %turn.key(), menu = %id, depth = turn.data.history.len(), "Activated menu");
        Ok(())
    }

    /// Post the menu as a new message
    pub fn send(&self, turn: &mut Turn<'_>, id: &str) -> Result<(), NavError> {
        let message = self.render(turn, id, false)?;
        turn.push_effect(Effect::Render {
            menu: id.to_string(),
            mode: RenderMode::Send,
            message,
        });
        Ok(())
    }

    /// Re-render the menu into its last message. A `done` refresh strips
    /// the keyboard and tolerates a message that no longer exists.
    pub fn refresh(&self, turn: &mut Turn<'_>, id: &str, done: bool) -> Result<(), NavError> {
        let message_id = turn.data.menu(id).and_then(|m| m.message_id);
        let message = self.render(turn, id, done)?;
        let mode = if done {
            RenderMode::Finalize { message_id }
        } else {
            RenderMode::Edit {
                message_id,
                reuse: None,
            }
        };
        turn.push_effect(Effect::Render {
            menu: id.to_string(),
            mode,
            message,
        });
        Ok(())
    }

    /// Open a menu as a new message, closing the current one
    pub fn show(&self, turn: &mut Turn<'_>, id: &str) -> Result<(), NavError> {
        self.registry.get(id)?;
        if let Some(current) = current_id(turn) {
            if self.registry.contains(&current) {
                let leaving = self.leave(turn, &current)?;
                finalize(turn, leaving);
            }
        }
        self.activate(turn, id, None)?;
        self.send(turn, id)
    }

    /// Move from the current menu to `to`, leaving the current menu's data
    /// untouched
    pub fn switch_to_menu(&self, turn: &mut Turn<'_>, to: &str) -> Result<(), NavError> {
        self.switch(turn, to, None)
    }

    /// Move from the current menu to `to`, applying `save` to the current
    /// menu first
    pub fn switch(&self, turn: &mut Turn<'_>, to: &str, save: Option<bool>) -> Result<(), NavError> {
        self.registry.get(to)?;
        let Some(from) = current_id(turn) else {
            self.activate(turn, to, None)?;
            return self.send(turn, to);
        };
        let leaving = self.leave(turn, &from)?;
        turn.data.apply_save(&from, save);
        tracing::debug!(session = %turn.key(), from = %from, to = %to, ?save, "Switching menu");
        self.arrive(turn, leaving, to, None)
    }

    /// Walk `delta` (negative) steps back in the history.
    ///
    /// Every popped menu gets `save` applied: `Some(true)` commits its data
    /// to `saved_data`, `Some(false)` discards it, `None` keeps it. The menu
    /// now on top is reactivated without a new history entry. Stepping past
    /// the first menu leaves the session in `DEFAULT`.
    pub fn go_back(&self, turn: &mut Turn<'_>, delta: i64, save: Option<bool>) -> Result<(), NavError> {
        if delta >= 0 {
            return Err(NavError::ForwardHistory(delta));
        }
        let from = current_id(turn).ok_or(NavError::NoActiveMenu)?;
        let steps = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
        let leaving = self.leave(turn, &from)?;

        let keep = turn.data.history.len().saturating_sub(steps);
        let popped = turn.data.history.split_off(keep);
        for id in &popped {
            turn.data.apply_save(id, save);
        }
        tracing::debug!(session = %turn.key(), from = %from, steps = popped.len(), ?save, "History step");

        match current_id(turn) {
            Some(to) => self.arrive(turn, leaving, &to, Some(false)),
            None => {
                finalize(turn, leaving);
                turn.set_state(DEFAULT)?;
                tracing::debug!(session = %turn.key(), "History exhausted, back to DEFAULT");
                Ok(())
            }
        }
    }

    /// Step back until `id` is the current menu
    pub fn go_back_to(&self, turn: &mut Turn<'_>, id: &str, save: Option<bool>) -> Result<(), NavError> {
        let position = turn
            .data
            .history
            .iter()
            .rposition(|entry| entry == id)
            .ok_or_else(|| NavError::NotInHistory(id.to_string()))?;
        let steps = turn.data.history.len() - 1 - position;
        if steps == 0 {
            return self.refresh(turn, id, false);
        }
        self.go_back(turn, -i64::try_from(steps).unwrap_or(i64::MAX), save)
    }

    /// Take a navigation button
    pub fn follow(&self, turn: &mut Turn<'_>, button: &NavButton) -> Result<(), NavError> {
        match button {
            NavButton::History { kind, delta, .. } => self.go_back(turn, *delta, kind.save()),
            NavButton::Goto(goto) => self.switch(turn, &goto.menu, goto.save),
        }
    }

    /// Handle a button press on `menu_id`.
    ///
    /// Tokens that don't decode, or that name something this menu does not
    /// render, are declined so the press ends as "action not found".
    pub fn handle_callback(&self, turn: &mut Turn<'_>, menu_id: &str, query: &CallbackQuery) -> Result<Flow, NavError> {
        let action = match callback::decode(&query.data) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(session = %turn.key(), menu = %menu_id, error = %e, "Undecodable callback");
                return Ok(Flow::Continue);
            }
        };
        let menu = self.registry.get(menu_id)?;

        match action.kind {
            CallbackType::Pagination => {
                let Some(requested) = action.value_i64() else {
                    return Ok(Flow::Continue);
                };
                let count = match menu.kind() {
                    MenuKind::Goto { .. } => menu.goto_buttons(&turn.data)?.len(),
                    _ => menu.selectable_buttons(&turn.data)?.len(),
                };
                let window = paginate(count, requested, turn.config().page_size);
                menu_data(turn, menu)?.page = window.page;
                self.refresh(turn, menu_id, false)?;
            }
            CallbackType::Back | CallbackType::Done | CallbackType::Cancel => {
                let Some(kind) = HistoryKind::from_callback_type(action.kind) else {
                    return Ok(Flow::Continue);
                };
                let Some(button) = menu.nav_button(kind, &turn.data)? else {
                    tracing::debug!(session = %turn.key(), menu = %menu_id, button = %action.kind, "Button not on menu");
                    return Ok(Flow::Continue);
                };
                self.follow(turn, &button)?;
            }
            CallbackType::Goto => {
                let Some(target) = action.value_str() else {
                    return Ok(Flow::Continue);
                };
                let Some(button) = menu
                    .rendered_gotos(&turn.data)?
                    .into_iter()
                    .find(|button| button.menu == target)
                else {
                    tracing::debug!(session = %turn.key(), menu = %menu_id, target = %target, "Goto target not on menu");
                    return Ok(Flow::Continue);
                };
                self.switch(turn, &button.menu, button.save)?;
            }
            CallbackType::Checkbox | CallbackType::Radiobutton => {
                let expected = match action.kind {
                    CallbackType::Checkbox => Selection::Checkbox,
                    _ => Selection::Radio,
                };
                if menu.selection() != Some(expected) {
                    return Ok(Flow::Continue);
                }
                let Some(value) = action.value_str() else {
                    return Ok(Flow::Continue);
                };
                let Some(button) = menu
                    .selectable_buttons(&turn.data)?
                    .into_iter()
                    .find(|button| button.value == value)
                else {
                    return Ok(Flow::Continue);
                };
                let tmp = &mut menu_data(turn, menu)?.data;
                match expected {
                    Selection::Checkbox => toggle_checkbox(tmp, &button),
                    Selection::Radio => *tmp = Value::from(button.value.as_str()),
                }
                self.refresh(turn, menu_id, false)?;
            }
        }
        Ok(Flow::abort())
    }

    /// Parse free text for a text menu and move on
    pub fn capture_text(&self, turn: &mut Turn<'_>, menu_id: &str, message: &IncomingMessage) -> Result<Flow, NavError> {
        let menu = self.registry.get(menu_id)?;
        let MenuKind::Text(kind) = menu.kind() else {
            return Ok(Flow::Continue);
        };
        if let Some(flow) = self.history_command(turn, menu, message)? {
            return Ok(flow);
        }
        let Some(text) = message.plain_text() else {
            return Ok(Flow::Continue);
        };

        match parse_text(kind, text) {
            Ok(value) => self.accept_input(turn, menu, value),
            Err(e) => {
                tracing::debug!(session = %turn.key(), menu = %menu_id, error = %e, "Rejected text input");
                let notice = match menu.parse_failure(&turn.data)? {
                    Some(notice) => notice,
                    None => turn.config().notices.parse_failure.clone(),
                };
                Ok(Flow::Abort(Some(notice)))
            }
        }
    }

    /// Take the file of the expected kind for an upload menu and move on
    pub fn capture_upload(&self, turn: &mut Turn<'_>, menu_id: &str, message: &IncomingMessage) -> Result<Flow, NavError> {
        let menu = self.registry.get(menu_id)?;
        let MenuKind::Upload(kind) = menu.kind() else {
            return Ok(Flow::Continue);
        };
        if let Some(flow) = self.history_command(turn, menu, message)? {
            return Ok(flow);
        }
        match message.attachment(*kind) {
            Some(attachment) => self.accept_input(turn, menu, Value::from(attachment.file_id.as_str())),
            None => Ok(Flow::Continue),
        }
    }

    /// `/done`, `/back` and `/cancel` for menus without keyboard
    pub fn handle_command(&self, turn: &mut Turn<'_>, menu_id: &str, message: &IncomingMessage) -> Result<Flow, NavError> {
        let menu = self.registry.get(menu_id)?;
        Ok(self.history_command(turn, menu, message)?.unwrap_or(Flow::Continue))
    }

    fn history_command(
        &self,
        turn: &mut Turn<'_>,
        menu: &MenuDefinition,
        message: &IncomingMessage,
    ) -> Result<Option<Flow>, NavError> {
        let Some(command) = message.command(turn.config().bot_username.as_deref()) else {
            return Ok(None);
        };
        let Some(kind) = HistoryKind::from_command(command.name) else {
            return Ok(None);
        };
        let button = menu
            .nav_button(kind, &turn.data)?
            .unwrap_or_else(|| NavButton::history(kind));
        self.follow(turn, &button)?;
        Ok(Some(Flow::abort()))
    }

    /// Store accepted input and leave through done, back or cancel,
    /// whichever is configured first, else a plain step back
    fn accept_input(&self, turn: &mut Turn<'_>, menu: &MenuDefinition, value: Value) -> Result<Flow, NavError> {
        menu_data(turn, menu)?.data = value;
        if let Some(message) = menu.parse_success(&turn.data)? {
            turn.reply(message);
        }
        let button = menu.completion_button(&turn.data)?.unwrap_or_else(NavButton::back);
        self.follow(turn, &button)?;
        Ok(Flow::abort())
    }

    fn render(&self, turn: &Turn<'_>, id: &str, done: bool) -> Result<OutgoingMessage, NavError> {
        Ok(self.registry.render(id, &turn.data, turn.config().page_size, done)?)
    }

    fn leave(&self, turn: &Turn<'_>, from: &str) -> Result<Leaving, NavError> {
        let menu = self.registry.get(from)?;
        Ok(Leaving {
            menu: from.to_string(),
            message_id: turn.data.menu(from).and_then(|m| m.message_id),
            force_reply: menu.is_force_reply(),
            done: self.render(turn, from, true)?,
        })
    }

    /// Activate `to` and show it: in place of the old message when both
    /// menus use inline keyboards, else as a new message after finalising
    /// the old one
    fn arrive(&self, turn: &mut Turn<'_>, leaving: Leaving, to: &str, add_history: Option<bool>) -> Result<(), NavError> {
        let target = self.registry.get(to)?;
        self.activate(turn, to, add_history)?;
        if leaving.force_reply || target.is_force_reply() {
            finalize(turn, leaving);
            return self.send(turn, to);
        }
        let message = self.render(turn, to, false)?;
        turn.push_effect(Effect::Render {
            menu: to.to_string(),
            mode: RenderMode::Edit {
                message_id: leaving.message_id,
                reuse: Some(leaving.menu),
            },
            message,
        });
        Ok(())
    }
}

fn current_id(turn: &Turn<'_>) -> Option<String> {
    turn.data.current_menu().map(str::to_string)
}

/// Create the menu's data on first activation
fn seed(turn: &mut Turn<'_>, menu: &MenuDefinition) -> Result<(), NavError> {
    if !turn.data.menus.contains_key(menu.id()) {
        let tmp = menu.prepare_tmp_data(&turn.data)?;
        turn.data.menus.insert(menu.id().to_string(), MenuData::new(tmp));
    }
    Ok(())
}

fn menu_data<'t>(turn: &'t mut Turn<'_>, menu: &MenuDefinition) -> Result<&'t mut MenuData, NavError> {
    seed(turn, menu)?;
    turn.data
        .menu_mut(menu.id())
        .ok_or_else(|| NavError::Menu(MenuError::UnknownMenu(menu.id().to_string())))
}

fn finalize(turn: &mut Turn<'_>, leaving: Leaving) {
    turn.push_effect(Effect::Render {
        menu: leaving.menu,
        mode: RenderMode::Finalize {
            message_id: leaving.message_id,
        },
        message: leaving.done,
    });
}

/// Flip one option of a checkbox menu's tmp data
pub fn toggle_checkbox(tmp: &mut Value, button: &SelectableButton) {
    let selected = button.is_selected(Selection::Checkbox, tmp);
    if !tmp.is_object() {
        *tmp = Value::Object(Map::new());
    }
    if let Value::Object(map) = tmp {
        map.insert(button.value.clone(), Value::Bool(!selected));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackData;
    use crate::config::MachineConfig;
    use crate::menu::{GotoButton, Markup, MenuEntry, TextKind};
    use crate::runtime::testing::{RecordingTransport, TransportCall};
    use crate::session::{Data, SessionKey};
    use crate::state_machine::{Attachment, AttachmentKind, Event, StateMachine};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> MenuRegistry {
        let mut registry = MenuRegistry::new();
        registry
            .add(MenuDefinition::goto("A", ["B"]).with_title("A"))
            .unwrap()
            .add(MenuDefinition::goto("B", ["C"]).with_back(NavButton::back()))
            .unwrap()
            .add(MenuDefinition::goto("C", Vec::<MenuEntry>::new()).with_back(NavButton::back()))
            .unwrap()
            .add(
                MenuDefinition::goto(
                    "MAIN",
                    [
                        GotoButton::new("NAME").with_save(None),
                        GotoButton::new("AGE").with_save(None),
                        GotoButton::new("TOPPINGS").with_save(None),
                    ],
                )
                .with_title("Main"),
            )
            .unwrap()
            .add(MenuDefinition::text_str("NAME").with_title("Name").with_done(NavButton::done()))
            .unwrap()
            .add(MenuDefinition::text_int("AGE").with_title("Age"))
            .unwrap()
            .add(
                MenuDefinition::checkbox(
                    "TOPPINGS",
                    vec![
                        SelectableButton::new("Cheese", "cheese").selected(),
                        SelectableButton::new("Olives", "olives"),
                    ],
                )
                .with_done(NavButton::done())
                .with_cancel(NavButton::cancel()),
            )
            .unwrap()
            .add(MenuDefinition::radio(
                "SIZE",
                vec![SelectableButton::new("Small", "s"), SelectableButton::new("Large", "l")],
            ))
            .unwrap()
            .add(MenuDefinition::upload("PHOTO", AttachmentKind::Photo).with_done(NavButton::done()))
            .unwrap()
            .add(MenuDefinition::send("NOTE"))
            .unwrap();
        registry
    }

    fn turn(config: &MachineConfig) -> Turn<'_> {
        Turn::new(SessionKey::private(1), DEFAULT, Data::new(), config)
    }

    fn press(data: &CallbackData) -> CallbackQuery {
        CallbackQuery {
            query_id: "q".to_string(),
            data: data.encode().unwrap(),
            message_id: None,
        }
    }

    fn text(text: &str) -> IncomingMessage {
        IncomingMessage {
            text: Some(text.to_string()),
            ..IncomingMessage::default()
        }
    }

    fn modes(turn: &Turn<'_>) -> Vec<(String, RenderMode)> {
        turn.effects()
            .iter()
            .filter_map(|effect| match effect {
                Effect::Render { menu, mode, .. } => Some((menu.clone(), mode.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_goto_scenario() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.activate(&mut turn, "A", None).unwrap();
        assert_eq!(turn.data.history, vec!["A"]);
        assert_eq!(turn.data.menus.get("A"), Some(&MenuData::default()));
        assert_eq!(turn.state(), "A");

        let flow = nav.handle_callback(&mut turn, "A", &press(&CallbackData::goto("B"))).unwrap();
        assert_eq!(flow, Flow::abort());
        assert_eq!(turn.data.history, vec!["A", "B"]);
        assert_eq!(turn.state(), "B");
        // a bare menu entry commits the menu it leaves
        assert_eq!(turn.data.saved("A"), Some(&Value::Null));
        assert_eq!(
            modes(&turn),
            vec![(
                "B".to_string(),
                RenderMode::Edit {
                    message_id: None,
                    reuse: Some("A".to_string())
                }
            )]
        );
    }

    #[test]
    fn test_repeated_activation_keeps_history() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.activate(&mut turn, "A", None).unwrap();
        nav.activate(&mut turn, "A", None).unwrap();
        assert_eq!(turn.data.history, vec!["A"]);
        nav.activate(&mut turn, "A", Some(true)).unwrap();
        assert_eq!(turn.data.history, vec!["A", "A"]);
        nav.activate(&mut turn, "B", Some(false)).unwrap();
        assert_eq!(turn.data.history, vec!["A", "A"]);
    }

    #[test]
    fn test_history_round_trip() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.activate(&mut turn, "A", None).unwrap();
        nav.switch_to_menu(&mut turn, "B").unwrap();
        nav.go_back(&mut turn, -1, None).unwrap();

        assert_eq!(turn.data.current_menu(), Some("A"));
        assert_eq!(turn.data.history, vec!["A"]);
        assert_eq!(turn.state(), "A");
        // pure back keeps the data of the menu left behind
        assert!(turn.data.menus.contains_key("B"));
    }

    #[test]
    fn test_go_back_multiple_steps() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.activate(&mut turn, "A", None).unwrap();
        nav.switch_to_menu(&mut turn, "B").unwrap();
        nav.switch_to_menu(&mut turn, "C").unwrap();
        nav.go_back(&mut turn, -2, Some(false)).unwrap();

        assert_eq!(turn.data.history, vec!["A"]);
        assert!(!turn.data.menus.contains_key("B"));
        assert!(!turn.data.menus.contains_key("C"));
        assert!(turn.data.saved_data.is_empty());
    }

    #[test]
    fn test_go_back_past_root() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "A").unwrap();
        nav.go_back(&mut turn, -1, None).unwrap();

        assert!(turn.data.history.is_empty());
        assert_eq!(turn.state(), DEFAULT);
        let last = modes(&turn).pop().unwrap();
        assert_eq!(last, ("A".to_string(), RenderMode::Finalize { message_id: None }));
    }

    #[test]
    fn test_go_back_errors() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        assert!(matches!(nav.go_back(&mut turn, -1, None), Err(NavError::NoActiveMenu)));
        nav.activate(&mut turn, "A", None).unwrap();
        assert!(matches!(nav.go_back(&mut turn, 1, None), Err(NavError::ForwardHistory(1))));
        assert!(matches!(nav.go_back(&mut turn, 0, None), Err(NavError::ForwardHistory(0))));
    }

    #[test]
    fn test_go_back_to() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.activate(&mut turn, "A", None).unwrap();
        nav.switch_to_menu(&mut turn, "B").unwrap();
        nav.switch_to_menu(&mut turn, "C").unwrap();
        assert!(matches!(
            nav.go_back_to(&mut turn, "MAIN", None),
            Err(NavError::NotInHistory(id)) if id == "MAIN"
        ));
        nav.go_back_to(&mut turn, "A", None).unwrap();
        assert_eq!(turn.data.history, vec!["A"]);
        assert_eq!(turn.state(), "A");
    }

    #[test]
    fn test_text_int_rejects_garbage() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "MAIN").unwrap();
        nav.switch_to_menu(&mut turn, "AGE").unwrap();
        let before = turn.data.clone();

        let flow = nav.capture_text(&mut turn, "AGE", &text("abc")).unwrap();
        assert_eq!(flow, Flow::abort_with("Could not parse."));
        assert_eq!(turn.data, before);
    }

    #[test]
    fn test_custom_parse_failure_message() {
        let mut registry = MenuRegistry::new();
        registry
            .add(MenuDefinition::text_int("AGE").with_parse_failure("Numbers only"))
            .unwrap();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "AGE").unwrap();

        let flow = nav.capture_text(&mut turn, "AGE", &text("twelve")).unwrap();
        assert_eq!(flow, Flow::abort_with("Numbers only"));
    }

    #[test]
    fn test_text_capture_done_commits() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "MAIN").unwrap();
        nav.switch_to_menu(&mut turn, "NAME").unwrap();
        let flow = nav.capture_text(&mut turn, "NAME", &text(" Ann ")).unwrap();

        assert_eq!(flow, Flow::abort());
        assert_eq!(turn.data.saved("NAME"), Some(&json!("Ann")));
        assert!(!turn.data.menus.contains_key("NAME"));
        assert_eq!(turn.data.history, vec!["MAIN"]);
        assert_eq!(turn.state(), "MAIN");
    }

    #[test]
    fn test_text_capture_implicit_back_keeps_data() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "MAIN").unwrap();
        nav.switch_to_menu(&mut turn, "AGE").unwrap();
        nav.capture_text(&mut turn, "AGE", &text("42")).unwrap();

        assert_eq!(turn.data.tmp_data("AGE"), &json!(42));
        assert_eq!(turn.data.saved("AGE"), None);
        assert_eq!(turn.data.history, vec!["MAIN"]);
    }

    #[test]
    fn test_text_capture_success_reply() {
        let mut registry = MenuRegistry::new();
        registry
            .add(MenuDefinition::text("MAIL", TextKind::Email).with_parse_success("Saved {data.menus.MAIL.data}"))
            .unwrap();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "MAIL").unwrap();

        nav.capture_text(&mut turn, "MAIL", &text("a@b.de")).unwrap();
        assert!(turn.effects().contains(&Effect::reply("Saved a@b.de")));
        assert_eq!(turn.state(), DEFAULT);
    }

    #[test]
    fn test_text_menu_ignores_other_commands() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "NAME").unwrap();

        let flow = nav.capture_text(&mut turn, "NAME", &text("/start")).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(turn.data.tmp_data("NAME"), &Value::Null);
    }

    #[test]
    fn test_cancel_discards() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "MAIN").unwrap();
        nav.switch_to_menu(&mut turn, "TOPPINGS").unwrap();
        nav.handle_callback(&mut turn, "TOPPINGS", &press(&CallbackData::checkbox("olives")))
            .unwrap();
        nav.handle_callback(&mut turn, "TOPPINGS", &press(&NavButton::cancel().callback()))
            .unwrap();

        assert!(!turn.data.menus.contains_key("TOPPINGS"));
        assert_eq!(turn.data.saved("TOPPINGS"), None);
        assert_eq!(turn.data.history, vec!["MAIN"]);
    }

    #[test]
    fn test_checkbox_toggle_and_done() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "TOPPINGS").unwrap();
        assert_eq!(turn.data.tmp_data("TOPPINGS"), &json!({"cheese": true, "olives": false}));

        let olives = press(&CallbackData::checkbox("olives"));
        assert_eq!(nav.handle_callback(&mut turn, "TOPPINGS", &olives).unwrap(), Flow::abort());
        assert_eq!(turn.data.tmp_data("TOPPINGS"), &json!({"cheese": true, "olives": true}));
        assert_eq!(turn.data.history, vec!["TOPPINGS"]);
        assert_eq!(
            modes(&turn).pop().unwrap().1,
            RenderMode::Edit {
                message_id: None,
                reuse: None
            }
        );

        nav.handle_callback(&mut turn, "TOPPINGS", &press(&NavButton::done().callback()))
            .unwrap();
        assert_eq!(turn.data.saved("TOPPINGS"), Some(&json!({"cheese": true, "olives": true})));
    }

    #[test]
    fn test_checkbox_unknown_value_declined() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "TOPPINGS").unwrap();
        let before = turn.data.clone();

        for data in [
            CallbackData::checkbox("anchovies"),
            CallbackData::radio("cheese"),
            NavButton::back().callback(),
        ] {
            assert_eq!(nav.handle_callback(&mut turn, "TOPPINGS", &press(&data)).unwrap(), Flow::Continue);
        }
        assert_eq!(turn.data, before);
    }

    #[test]
    fn test_radio_select() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "SIZE").unwrap();
        assert_eq!(turn.data.tmp_data("SIZE"), &Value::Null);

        nav.handle_callback(&mut turn, "SIZE", &press(&CallbackData::radio("l"))).unwrap();
        assert_eq!(turn.data.tmp_data("SIZE"), &json!("l"));
        nav.handle_callback(&mut turn, "SIZE", &press(&CallbackData::radio("s"))).unwrap();
        assert_eq!(turn.data.tmp_data("SIZE"), &json!("s"));
    }

    #[test]
    fn test_pagination_clamps() {
        let mut registry = MenuRegistry::new();
        let buttons: Vec<SelectableButton> = (0..23)
            .map(|i| SelectableButton::new(format!("Option {i}"), format!("o{i}")))
            .collect();
        registry.add(MenuDefinition::checkbox("MANY", buttons)).unwrap();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "MANY").unwrap();

        let page = |turn: &Turn<'_>| turn.data.menu("MANY").unwrap().page;
        nav.handle_callback(&mut turn, "MANY", &press(&CallbackData::pagination(1))).unwrap();
        assert_eq!(page(&turn), 1);
        nav.handle_callback(&mut turn, "MANY", &press(&CallbackData::pagination(99))).unwrap();
        assert_eq!(page(&turn), 2);
        let negative = CallbackData::new(CallbackType::Pagination, Value::Null, json!(-1));
        nav.handle_callback(&mut turn, "MANY", &press(&negative)).unwrap();
        assert_eq!(page(&turn), 0);
    }

    #[test]
    fn test_goto_only_rendered_targets() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "A").unwrap();

        let flow = nav.handle_callback(&mut turn, "A", &press(&CallbackData::goto("MAIN"))).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(turn.data.history, vec!["A"]);
    }

    #[test]
    fn test_undecodable_callback_declined() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "A").unwrap();

        let query = CallbackQuery {
            query_id: "q".to_string(),
            data: "not json".to_string(),
            message_id: None,
        };
        assert_eq!(nav.handle_callback(&mut turn, "A", &query).unwrap(), Flow::Continue);
    }

    #[test]
    fn test_upload_takes_largest_photo() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "PHOTO").unwrap();

        let nothing = text("a caption");
        assert_eq!(nav.capture_upload(&mut turn, "PHOTO", &nothing).unwrap(), Flow::Continue);

        let message = IncomingMessage {
            attachments: vec![
                Attachment::new(AttachmentKind::Photo, "small").with_size(10),
                Attachment::new(AttachmentKind::Photo, "large").with_size(1000),
                Attachment::new(AttachmentKind::Document, "doc"),
            ],
            ..IncomingMessage::default()
        };
        assert_eq!(nav.capture_upload(&mut turn, "PHOTO", &message).unwrap(), Flow::abort());
        assert_eq!(turn.data.saved("PHOTO"), Some(&json!("large")));
        assert_eq!(turn.state(), DEFAULT);
    }

    #[test]
    fn test_send_menu_commands() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);

        nav.show(&mut turn, "MAIN").unwrap();
        nav.switch_to_menu(&mut turn, "NOTE").unwrap();
        // keyboard menu to force reply: finalize the old message, send a new one
        assert_eq!(
            modes(&turn)[1..].to_vec(),
            vec![
                ("MAIN".to_string(), RenderMode::Finalize { message_id: None }),
                ("NOTE".to_string(), RenderMode::Send),
            ]
        );

        assert_eq!(nav.handle_command(&mut turn, "NOTE", &text("hello")).unwrap(), Flow::Continue);
        assert_eq!(nav.handle_command(&mut turn, "NOTE", &text("/help")).unwrap(), Flow::Continue);
        assert_eq!(nav.handle_command(&mut turn, "NOTE", &text("/cancel")).unwrap(), Flow::abort());
        assert_eq!(turn.data.history, vec!["MAIN"]);
        assert!(!turn.data.menus.contains_key("NOTE"));
    }

    #[test]
    fn test_show_finalizes_current_menu() {
        let registry = registry();
        let nav = Navigator::new(&registry);
        let config = MachineConfig::default();
        let mut turn = turn(&config);
        nav.show(&mut turn, "A").unwrap();
        turn.data.menu_mut("A").unwrap().message_id = Some(7);

        nav.show(&mut turn, "MAIN").unwrap();
        assert_eq!(
            modes(&turn)[1..].to_vec(),
            vec![
                ("A".to_string(), RenderMode::Finalize { message_id: Some(7) }),
                ("MAIN".to_string(), RenderMode::Send),
            ]
        );
        assert_eq!(turn.data.history, vec!["A", "MAIN"]);
    }

    #[test]
    fn test_toggle_checkbox_on_empty_data() {
        let button = SelectableButton::new("Cheese", "cheese");
        let mut tmp = Value::Null;
        toggle_checkbox(&mut tmp, &button);
        assert_eq!(tmp, json!({"cheese": true}));
        toggle_checkbox(&mut tmp, &button);
        assert_eq!(tmp, json!({"cheese": false}));
    }

    #[test]
    fn test_whole_flow_through_state_machine() {
        let registry = Arc::new(registry());
        let mut machine = StateMachine::new(MemoryStore::new(), MachineConfig::default());
        registry.install(&mut machine).unwrap();
        let start = Arc::clone(&registry);
        machine.default_state_mut().on_command("start", move |turn, _| {
            start.show(turn, "MAIN")?;
            Ok(Flow::abort())
        });

        let transport = RecordingTransport::new();
        let key = SessionKey::private(9);

        let outcome = machine.process(&Event::text(key, "/start"), &transport);
        assert_eq!(outcome.state, "MAIN");
        assert_eq!(outcome.data.menu("MAIN").unwrap().message_id, Some(1));
        let main = transport.last_message().unwrap();
        assert_eq!(main.text, "<b>Main</b>\n");
        assert_eq!(main.buttons().len(), 3);

        transport.clear();
        let goto = CallbackData::goto("NAME").encode().unwrap();
        let outcome = machine.process(&Event::callback(key, "q1", goto, Some(1)), &transport);
        assert_eq!(outcome.state, "NAME");
        assert_eq!(outcome.data.history, vec!["MAIN", "NAME"]);
        assert_eq!(outcome.data.menu("NAME").unwrap().message_id, Some(2));
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(
            &calls[0],
            TransportCall::Edit { message_id: 1, message, .. } if message.markup.is_none()
        ));
        assert!(matches!(
            &calls[1],
            TransportCall::Send { message_id: 2, message, .. }
                if message.markup == Some(Markup::ForceReply { selective: true })
        ));
        assert_eq!(transport.answers(), vec![(Some("OK".to_string()), false)]);

        transport.clear();
        let outcome = machine.process(&Event::text(key, "Ann"), &transport);
        assert_eq!(outcome.state, "MAIN");
        assert_eq!(outcome.data.history, vec!["MAIN"]);
        assert_eq!(outcome.data.saved("NAME"), Some(&json!("Ann")));
        assert_eq!(outcome.data.menu("MAIN").unwrap().message_id, Some(3));
        assert!(matches!(
            &transport.calls()[0],
            TransportCall::Edit { message_id: 2, message, .. } if message.text == "<b>Name</b>\n<i>Ann</i>\n"
        ));
        assert!(outcome.persisted);
    }

    #[test]
    fn test_bad_text_replies_through_state_machine() {
        let registry = Arc::new(registry());
        let mut machine = StateMachine::new(MemoryStore::new(), MachineConfig::default());
        registry.install(&mut machine).unwrap();
        let start = Arc::clone(&registry);
        machine.default_state_mut().on_command("age", move |turn, _| {
            start.show(turn, "AGE")?;
            Ok(Flow::abort())
        });
        let transport = RecordingTransport::new();
        let key = SessionKey::private(3);

        machine.process(&Event::text(key, "/age"), &transport);
        transport.clear();
        let outcome = machine.process(&Event::text(key, "abc"), &transport);

        assert_eq!(outcome.state, "AGE");
        assert_eq!(outcome.notice.as_deref(), Some("Could not parse."));
        assert_eq!(transport.sent_texts(), vec!["Could not parse."]);
        assert_eq!(outcome.data.history, vec!["AGE"]);
    }
}
