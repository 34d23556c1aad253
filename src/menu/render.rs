//! Turning a menu into a chat message

use super::button::{NavButton, Selection};
use super::definition::{MenuDefinition, MenuKind};
use super::registry::MenuRegistry;
use super::MenuError;
use crate::callback::{CallbackData, CallbackError};
use crate::session::Data;

/// A button of an inline keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback: &CallbackData) -> Result<Self, CallbackError> {
        Ok(Self {
            label: label.into(),
            callback_data: callback.encode()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    InlineKeyboard(Vec<Vec<InlineButton>>),
    /// Ask the client to reply to the message
    ForceReply { selective: bool },
}

/// An HTML formatted message with optional markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Option<Markup>,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>, markup: Option<Markup>) -> Self {
        Self {
            text: text.into(),
            markup,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }

    /// All keyboard buttons, row by row
    pub fn buttons(&self) -> Vec<&InlineButton> {
        match &self.markup {
            Some(Markup::InlineKeyboard(rows)) => rows.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// The visible page of a paginated keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub pages: u32,
}

impl PageWindow {
    /// Index range of the content buttons on this page
    pub fn range(&self, count: usize, page_size: usize) -> std::ops::Range<usize> {
        let page_size = page_size.max(1);
        let start = (self.page as usize).saturating_mul(page_size).min(count);
        let end = start.saturating_add(page_size).min(count);
        start..end
    }
}

/// Page count and clamped page for `count` content buttons.
///
/// There is always at least one page and an exact multiple of `page_size`
/// gets a trailing empty page.
pub fn paginate(count: usize, requested: i64, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let pages = u32::try_from(count / page_size + 1).unwrap_or(u32::MAX);
    let last = i64::from(pages - 1);
    let page = u32::try_from(requested.clamp(0, last)).unwrap_or(0);
    PageWindow { page, pages }
}

/// `<`, up to two previous pages, up to two next pages, `>`.
/// Labels count from one.
pub fn pagination_row(window: PageWindow) -> Result<Vec<InlineButton>, CallbackError> {
    let PageWindow { page, pages } = window;
    let mut row = Vec::new();
    if page > 0 {
        row.push(InlineButton::new("<", &CallbackData::pagination(page - 1))?);
    }
    for i in page.saturating_sub(2)..page {
        row.push(InlineButton::new((i + 1).to_string(), &CallbackData::pagination(i))?);
    }
    for i in (page + 1)..(page + 3).min(pages) {
        row.push(InlineButton::new((i + 1).to_string(), &CallbackData::pagination(i))?);
    }
    if page + 1 < pages {
        row.push(InlineButton::new(">", &CallbackData::pagination(page + 1))?);
    }
    Ok(row)
}

/// Content buttons two per row, then the pagination row, then the
/// navigation row
pub fn keyboard(
    content: Vec<InlineButton>,
    pagination: Vec<InlineButton>,
    navigation: Vec<InlineButton>,
) -> Vec<Vec<InlineButton>> {
    let mut rows: Vec<Vec<InlineButton>> = Vec::new();
    let mut content = content.into_iter();
    while let Some(first) = content.next() {
        let mut row = vec![first];
        row.extend(content.next());
        rows.push(row);
    }
    if !pagination.is_empty() {
        rows.push(pagination);
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }
    rows
}

/// Render `menu` for the session. A `done` render is the final form of a
/// message the session moved away from and carries no keyboard.
pub(crate) fn render_menu(
    registry: &MenuRegistry,
    menu: &MenuDefinition,
    data: &Data,
    page_size: usize,
    done: bool,
) -> Result<OutgoingMessage, MenuError> {
    let text = menu_text(menu, data)?;
    if done {
        return Ok(OutgoingMessage::plain(text));
    }
    let markup = match menu.kind() {
        MenuKind::Send | MenuKind::Text(_) | MenuKind::Upload(_) => Markup::ForceReply { selective: true },
        MenuKind::Goto { .. } | MenuKind::Checkbox { .. } | MenuKind::Radio { .. } => {
            Markup::InlineKeyboard(menu_keyboard(registry, menu, data, page_size)?)
        }
    };
    Ok(OutgoingMessage::new(text, Some(markup)))
}

fn menu_text(menu: &MenuDefinition, data: &Data) -> Result<String, MenuError> {
    let escape = |s: &str| {
        if menu.escapes_html() {
            escape_html(s)
        } else {
            s.to_string()
        }
    };
    let mut text = String::new();
    if let Some(title) = menu.title(data)?.filter(|t| !t.is_empty()) {
        if menu.escapes_html() {
            text.push_str(&format!("<b>{}</b>\n", escape_html(&title)));
        } else {
            text.push_str(&title);
            text.push('\n');
        }
    }
    if let Some(description) = menu.description(data)?.filter(|d| !d.is_empty()) {
        text.push_str(&escape(&description));
        text.push('\n');
    }
    if let Some(value) = menu.display_value(data)?.filter(|v| !v.is_empty()) {
        if menu.escapes_html() {
            text.push_str(&format!("<i>{}</i>\n", escape_html(&value)));
        } else {
            text.push_str(&value);
            text.push('\n');
        }
    }
    Ok(text)
}

fn menu_keyboard(
    registry: &MenuRegistry,
    menu: &MenuDefinition,
    data: &Data,
    page_size: usize,
) -> Result<Vec<Vec<InlineButton>>, MenuError> {
    let page_size = page_size.max(1);
    let tmp = data.tmp_data(menu.id());
    let content = match menu.kind() {
        MenuKind::Goto { .. } => menu
            .goto_buttons(data)?
            .into_iter()
            .map(|button| {
                let label = match &button.label {
                    Some(label) => label.clone(),
                    None => registry.label_for(&button.menu, data)?,
                };
                Ok(InlineButton::new(label, &button.callback())?)
            })
            .collect::<Result<Vec<_>, MenuError>>()?,
        MenuKind::Checkbox { .. } | MenuKind::Radio { .. } => {
            let selection = menu.selection().unwrap_or(Selection::Checkbox);
            menu.selectable_buttons(data)?
                .iter()
                .map(|button| InlineButton::new(button.label(selection, tmp), &button.callback(selection)))
                .collect::<Result<Vec<_>, CallbackError>>()?
        }
        MenuKind::Send | MenuKind::Text(_) | MenuKind::Upload(_) => Vec::new(),
    };

    let requested = data.menu(menu.id()).map_or(0, |m| i64::from(m.page));
    let window = paginate(content.len(), requested, page_size);
    let range = window.range(content.len(), page_size);
    let visible: Vec<InlineButton> = content
        .into_iter()
        .skip(range.start)
        .take(range.len())
        .collect();
    let pagination = if window.pages > 1 {
        pagination_row(window)?
    } else {
        Vec::new()
    };

    let mut navigation = Vec::new();
    for button in menu.nav_buttons(data)? {
        let label = match &button {
            NavButton::History { label, .. } => label.clone(),
            NavButton::Goto(goto) => match &goto.label {
                Some(label) => label.clone(),
                None => registry.label_for(&goto.menu, data)?,
            },
        };
        navigation.push(InlineButton::new(label, &button.callback())?);
    }

    Ok(keyboard(visible, pagination, navigation))
}
