//! Immutable menu definitions

use super::button::{GotoButton, HistoryKind, MenuEntry, NavButton, SelectableButton, Selection};
use super::parse::TextKind;
use super::MenuError;
use crate::resolve::{display_value, ResolveError, Resolvable};
use crate::session::Data;
use crate::state_machine::AttachmentKind;
use serde_json::{Map, Value};

/// Behavior of a menu
#[derive(Debug, Clone)]
pub enum MenuKind {
    /// A list of menus to open
    Goto { menus: Resolvable<Vec<MenuEntry>> },
    /// Any number of options; tmp data maps option values to booleans
    Checkbox {
        checkboxes: Resolvable<Vec<SelectableButton>>,
    },
    /// Exactly one option; tmp data is the selected value
    Radio {
        radiobuttons: Resolvable<Vec<SelectableButton>>,
    },
    /// Free text, parsed on arrival
    Text(TextKind),
    /// A file of the given kind
    Upload(AttachmentKind),
    /// A prompt without keyboard, left with `/done`, `/back` or `/cancel`
    Send,
}

/// A menu, declared once and shared by all sessions. Per-session state
/// lives in the session's `Data` under the menu id.
#[derive(Debug, Clone)]
pub struct MenuDefinition {
    id: String,
    kind: MenuKind,
    title: Resolvable<Option<String>>,
    description: Resolvable<Option<String>>,
    done: Resolvable<Option<NavButton>>,
    back: Resolvable<Option<NavButton>>,
    cancel: Resolvable<Option<NavButton>>,
    parse_failure: Option<Resolvable<String>>,
    parse_success: Option<Resolvable<String>>,
    escape_html: bool,
}

const PASSWORD_MASK: &str = "••••••";

impl MenuDefinition {
    pub fn new(id: impl Into<String>, kind: MenuKind) -> Self {
        Self {
            id: id.into(),
            kind,
            title: Resolvable::Literal(None),
            description: Resolvable::Literal(None),
            done: Resolvable::Literal(None),
            back: Resolvable::Literal(None),
            cancel: Resolvable::Literal(None),
            parse_failure: None,
            parse_success: None,
            escape_html: true,
        }
    }

    pub fn goto<E: Into<MenuEntry>>(id: impl Into<String>, menus: impl IntoIterator<Item = E>) -> Self {
        let menus: Vec<MenuEntry> = menus.into_iter().map(Into::into).collect();
        Self::new(id, MenuKind::Goto { menus: menus.into() })
    }

    pub fn checkbox(id: impl Into<String>, checkboxes: Vec<SelectableButton>) -> Self {
        Self::new(
            id,
            MenuKind::Checkbox {
                checkboxes: checkboxes.into(),
            },
        )
    }

    pub fn radio(id: impl Into<String>, radiobuttons: Vec<SelectableButton>) -> Self {
        Self::new(
            id,
            MenuKind::Radio {
                radiobuttons: radiobuttons.into(),
            },
        )
    }

    pub fn text(id: impl Into<String>, kind: TextKind) -> Self {
        Self::new(id, MenuKind::Text(kind))
    }

    pub fn text_str(id: impl Into<String>) -> Self {
        Self::text(id, TextKind::Str)
    }

    pub fn text_int(id: impl Into<String>) -> Self {
        Self::text(id, TextKind::Int)
    }

    pub fn upload(id: impl Into<String>, kind: AttachmentKind) -> Self {
        Self::new(id, MenuKind::Upload(kind))
    }

    pub fn send(id: impl Into<String>) -> Self {
        Self::new(id, MenuKind::Send)
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Resolvable::Literal(Some(title.into()));
        self
    }

    #[must_use]
    pub fn with_title_from(mut self, title: Resolvable<Option<String>>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Resolvable::Literal(Some(description.into()));
        self
    }

    #[must_use]
    pub fn with_description_from(mut self, description: Resolvable<Option<String>>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_done(mut self, button: NavButton) -> Self {
        self.done = Resolvable::Literal(Some(button));
        self
    }

    #[must_use]
    pub fn with_back(mut self, button: NavButton) -> Self {
        self.back = Resolvable::Literal(Some(button));
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, button: NavButton) -> Self {
        self.cancel = Resolvable::Literal(Some(button));
        self
    }

    /// Set a navigation slot from a resolvable
    #[must_use]
    pub fn with_nav_from(mut self, kind: HistoryKind, button: Resolvable<Option<NavButton>>) -> Self {
        match kind {
            HistoryKind::Done => self.done = button,
            HistoryKind::Back => self.back = button,
            HistoryKind::Cancel => self.cancel = button,
        }
        self
    }

    /// Reply for text that does not parse, a template filled from the
    /// session data
    #[must_use]
    pub fn with_parse_failure(self, template: impl Into<String>) -> Self {
        self.with_parse_failure_from(Resolvable::template(template))
    }

    #[must_use]
    pub fn with_parse_failure_from(mut self, message: Resolvable<String>) -> Self {
        self.parse_failure = Some(message);
        self
    }

    /// Reply after text or a file was accepted, a template filled from the
    /// session data after the value is stored
    #[must_use]
    pub fn with_parse_success(self, template: impl Into<String>) -> Self {
        self.with_parse_success_from(Resolvable::template(template))
    }

    #[must_use]
    pub fn with_parse_success_from(mut self, message: Resolvable<String>) -> Self {
        self.parse_success = Some(message);
        self
    }

    /// Whether title, description and value are HTML escaped (default)
    #[must_use]
    pub fn with_escape_html(mut self, escape: bool) -> Self {
        self.escape_html = escape;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &MenuKind {
        &self.kind
    }

    pub fn escapes_html(&self) -> bool {
        self.escape_html
    }

    /// Prompts without inline keyboard can't be edited into a keyboard menu
    /// or back
    pub fn is_force_reply(&self) -> bool {
        matches!(self.kind, MenuKind::Send | MenuKind::Text(_) | MenuKind::Upload(_))
    }

    pub fn selection(&self) -> Option<Selection> {
        match self.kind {
            MenuKind::Checkbox { .. } => Some(Selection::Checkbox),
            MenuKind::Radio { .. } => Some(Selection::Radio),
            _ => None,
        }
    }

    pub fn title(&self, data: &Data) -> Result<Option<String>, ResolveError> {
        self.title.resolve(self, data)
    }

    pub fn description(&self, data: &Data) -> Result<Option<String>, ResolveError> {
        self.description.resolve(self, data)
    }

    pub fn nav_button(&self, kind: HistoryKind, data: &Data) -> Result<Option<NavButton>, ResolveError> {
        self.nav_slot(kind).resolve(self, data)
    }

    pub(crate) fn nav_slot(&self, kind: HistoryKind) -> &Resolvable<Option<NavButton>> {
        match kind {
            HistoryKind::Done => &self.done,
            HistoryKind::Back => &self.back,
            HistoryKind::Cancel => &self.cancel,
        }
    }

    /// Configured navigation buttons in display order: cancel, back, done
    pub fn nav_buttons(&self, data: &Data) -> Result<Vec<NavButton>, ResolveError> {
        let mut buttons = Vec::new();
        for kind in [HistoryKind::Cancel, HistoryKind::Back, HistoryKind::Done] {
            buttons.extend(self.nav_button(kind, data)?);
        }
        Ok(buttons)
    }

    /// The button taken after input was accepted: done, else back, else
    /// cancel
    pub fn completion_button(&self, data: &Data) -> Result<Option<NavButton>, ResolveError> {
        for kind in HistoryKind::ALL {
            if let Some(button) = self.nav_button(kind, data)? {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }

    pub fn parse_failure(&self, data: &Data) -> Result<Option<String>, ResolveError> {
        self.parse_failure
            .as_ref()
            .map(|message| message.resolve(self, data))
            .transpose()
    }

    pub fn parse_success(&self, data: &Data) -> Result<Option<String>, ResolveError> {
        self.parse_success
            .as_ref()
            .map(|message| message.resolve(self, data))
            .transpose()
    }

    /// Content buttons of a goto menu
    pub fn goto_buttons(&self, data: &Data) -> Result<Vec<GotoButton>, ResolveError> {
        match &self.kind {
            MenuKind::Goto { menus } => Ok(menus
                .resolve(self, data)?
                .into_iter()
                .map(MenuEntry::into_button)
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Every goto this menu renders, content and navigation buttons alike
    pub fn rendered_gotos(&self, data: &Data) -> Result<Vec<GotoButton>, ResolveError> {
        let mut gotos = self.goto_buttons(data)?;
        for button in self.nav_buttons(data)? {
            if let NavButton::Goto(goto) = button {
                gotos.push(goto);
            }
        }
        Ok(gotos)
    }

    pub fn selectable_buttons(&self, data: &Data) -> Result<Vec<SelectableButton>, ResolveError> {
        match &self.kind {
            MenuKind::Checkbox { checkboxes } => checkboxes.resolve(self, data),
            MenuKind::Radio { radiobuttons } => radiobuttons.resolve(self, data),
            _ => Ok(Vec::new()),
        }
    }

    /// Initial tmp data on the first activation of this menu in a session
    pub fn prepare_tmp_data(&self, data: &Data) -> Result<Value, MenuError> {
        match &self.kind {
            MenuKind::Checkbox { checkboxes } => {
                let seeded: Map<String, Value> = checkboxes
                    .resolve(self, data)?
                    .into_iter()
                    .map(|button| (button.value, Value::Bool(button.default_selected)))
                    .collect();
                Ok(Value::Object(seeded))
            }
            MenuKind::Radio { radiobuttons } => {
                default_radio(&self.id, &radiobuttons.resolve(self, data)?)
            }
            MenuKind::Goto { .. } | MenuKind::Text(_) | MenuKind::Upload(_) | MenuKind::Send => {
                Ok(Value::Null)
            }
        }
    }

    /// Human readable form of the tmp data, shown in italics below the
    /// description
    pub fn display_value(&self, data: &Data) -> Result<Option<String>, ResolveError> {
        let tmp = data.tmp_data(&self.id);
        let value = match &self.kind {
            MenuKind::Goto { .. } | MenuKind::Send => None,
            MenuKind::Checkbox { .. } | MenuKind::Radio { .. } => {
                let selection = self.selection().unwrap_or(Selection::Checkbox);
                if tmp.is_null() {
                    return Ok(None);
                }
                let selected: Vec<String> = self
                    .selectable_buttons(data)?
                    .into_iter()
                    .filter(|button| button.is_selected(selection, tmp))
                    .map(|button| button.title)
                    .collect();
                Some(selected.join(", "))
            }
            MenuKind::Text(TextKind::Password) => {
                (!tmp.is_null()).then(|| PASSWORD_MASK.to_string())
            }
            MenuKind::Text(_) | MenuKind::Upload(_) => Some(display_value(tmp)),
        };
        Ok(value.filter(|v| !v.is_empty()))
    }
}

/// The default selection of a radio menu, at most one
pub(crate) fn default_radio(menu: &str, buttons: &[SelectableButton]) -> Result<Value, MenuError> {
    let mut defaults = buttons.iter().filter(|button| button.default_selected);
    let first = defaults.next();
    if defaults.next().is_some() {
        return Err(MenuError::MultipleRadioDefaults(menu.to_string()));
    }
    Ok(first.map_or(Value::Null, |button| Value::from(button.value.as_str())))
}
