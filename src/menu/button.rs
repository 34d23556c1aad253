//! Buttons a menu can show

use crate::callback::{CallbackData, CallbackType};
use serde_json::Value;

/// The three history buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    Done,
    Back,
    Cancel,
}

impl HistoryKind {
    pub const ALL: [HistoryKind; 3] = [HistoryKind::Done, HistoryKind::Back, HistoryKind::Cancel];

    /// What happens to the tmp data of the menus left behind: done commits,
    /// cancel discards, back leaves it alone
    pub fn save(self) -> Option<bool> {
        match self {
            HistoryKind::Done => Some(true),
            HistoryKind::Back => None,
            HistoryKind::Cancel => Some(false),
        }
    }

    pub fn callback_type(self) -> CallbackType {
        match self {
            HistoryKind::Done => CallbackType::Done,
            HistoryKind::Back => CallbackType::Back,
            HistoryKind::Cancel => CallbackType::Cancel,
        }
    }

    pub fn from_callback_type(kind: CallbackType) -> Option<Self> {
        match kind {
            CallbackType::Done => Some(HistoryKind::Done),
            CallbackType::Back => Some(HistoryKind::Back),
            CallbackType::Cancel => Some(HistoryKind::Cancel),
            _ => None,
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            HistoryKind::Done => "Done",
            HistoryKind::Back => "Back",
            HistoryKind::Cancel => "Cancel",
        }
    }

    /// Command that triggers this button on menus without a keyboard
    pub fn command(self) -> &'static str {
        match self {
            HistoryKind::Done => "done",
            HistoryKind::Back => "back",
            HistoryKind::Cancel => "cancel",
        }
    }

    pub fn from_command(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.command() == name)
    }
}

/// Opens another menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoButton {
    pub menu: String,
    /// Defaults to the target menu's title
    pub label: Option<String>,
    /// Save policy applied to the current menu before leaving it
    pub save: Option<bool>,
}

impl GotoButton {
    pub fn new(menu: impl Into<String>) -> Self {
        Self {
            menu: menu.into(),
            label: None,
            save: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_save(mut self, save: Option<bool>) -> Self {
        self.save = save;
        self
    }

    pub fn callback(&self) -> CallbackData {
        CallbackData::goto(&self.menu)
    }
}

/// A done, back or cancel slot of a menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavButton {
    /// Walk back in the history
    History {
        kind: HistoryKind,
        label: String,
        delta: i64,
    },
    /// Jump to a menu instead
    Goto(GotoButton),
}

impl NavButton {
    pub fn history(kind: HistoryKind) -> Self {
        NavButton::History {
            kind,
            label: kind.default_label().to_string(),
            delta: -1,
        }
    }

    pub fn done() -> Self {
        Self::history(HistoryKind::Done)
    }

    pub fn back() -> Self {
        Self::history(HistoryKind::Back)
    }

    pub fn cancel() -> Self {
        Self::history(HistoryKind::Cancel)
    }

    pub fn goto(menu: impl Into<String>, save: Option<bool>) -> Self {
        NavButton::Goto(GotoButton::new(menu).with_save(save))
    }

    #[must_use]
    pub fn with_label(self, new_label: impl Into<String>) -> Self {
        match self {
            NavButton::History { kind, delta, .. } => NavButton::History {
                kind,
                label: new_label.into(),
                delta,
            },
            NavButton::Goto(button) => NavButton::Goto(button.with_label(new_label)),
        }
    }

    /// Step more than one menu back
    #[must_use]
    pub fn with_delta(self, new_delta: i64) -> Self {
        match self {
            NavButton::History { kind, label, .. } => NavButton::History {
                kind,
                label,
                delta: new_delta,
            },
            goto @ NavButton::Goto(_) => goto,
        }
    }

    pub fn save(&self) -> Option<bool> {
        match self {
            NavButton::History { kind, .. } => kind.save(),
            NavButton::Goto(button) => button.save,
        }
    }

    pub fn callback(&self) -> CallbackData {
        match self {
            NavButton::History { kind, delta, .. } => CallbackData::history(kind.callback_type(), *delta),
            NavButton::Goto(button) => button.callback(),
        }
    }
}

/// One destination of a goto menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Bare menu reference: open it, committing the current menu's data
    Menu(String),
    Button(GotoButton),
}

impl MenuEntry {
    pub fn menu(id: impl Into<String>) -> Self {
        MenuEntry::Menu(id.into())
    }

    pub fn target(&self) -> &str {
        match self {
            MenuEntry::Menu(id) => id,
            MenuEntry::Button(button) => &button.menu,
        }
    }

    /// Expand into the navigation button it stands for
    pub fn into_button(self) -> GotoButton {
        match self {
            MenuEntry::Menu(id) => GotoButton::new(id).with_save(Some(true)),
            MenuEntry::Button(button) => button,
        }
    }
}

impl From<&str> for MenuEntry {
    fn from(id: &str) -> Self {
        MenuEntry::Menu(id.to_string())
    }
}

impl From<GotoButton> for MenuEntry {
    fn from(button: GotoButton) -> Self {
        MenuEntry::Button(button)
    }
}

/// Which kind of selection a [`SelectableButton`] takes part in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Checkbox,
    Radio,
}

impl Selection {
    pub fn emoji(self, selected: bool) -> &'static str {
        match (self, selected) {
            (Selection::Checkbox, true) => "✅",
            (Selection::Checkbox, false) => "❌",
            (Selection::Radio, true) => "🔘",
            (Selection::Radio, false) => "⚫️",
        }
    }
}

/// A checkbox or radio option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableButton {
    pub title: String,
    /// Key inside the menu's tmp data
    pub value: String,
    pub default_selected: bool,
}

impl SelectableButton {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            default_selected: false,
        }
    }

    #[must_use]
    pub fn selected(mut self) -> Self {
        self.default_selected = true;
        self
    }

    /// Whether this option is selected in `tmp`
    pub fn is_selected(&self, selection: Selection, tmp: &Value) -> bool {
        match selection {
            Selection::Checkbox => tmp
                .get(&self.value)
                .and_then(Value::as_bool)
                .unwrap_or(self.default_selected),
            Selection::Radio => match tmp.as_str() {
                Some(current) if !current.is_empty() => current == self.value,
                _ => self.default_selected,
            },
        }
    }

    pub fn label(&self, selection: Selection, tmp: &Value) -> String {
        format!("{} {}", selection.emoji(self.is_selected(selection, tmp)), self.title)
    }

    pub fn callback(&self, selection: Selection) -> CallbackData {
        match selection {
            Selection::Checkbox => CallbackData::checkbox(&self.value),
            Selection::Radio => CallbackData::radio(&self.value),
        }
    }
}
