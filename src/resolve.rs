//! Resolution of menu definition fields
//!
//! A field such as a title or a button list can be a plain value, a text
//! template filled from the session, or a function of the session. The
//! shape is fixed when the menu is defined; resolving is a plain `match`.

use crate::menu::MenuDefinition;
use crate::session::Data;
use regex::Regex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unknown template placeholder {{{0}}}")]
    Template(String),
}

type ThunkFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
type DataFn<T> = Arc<dyn Fn(&Data) -> T + Send + Sync>;
type MethodFn<T> = Arc<dyn Fn(&MenuDefinition, &Data) -> T + Send + Sync>;

/// A menu definition field, resolved against the session at render time
pub enum Resolvable<T> {
    /// Used as is
    Literal(T),
    /// `{data.path}` / `{menu.path}` placeholders filled from the session,
    /// then converted into `T`
    Template(String, fn(String) -> T),
    /// Computed without looking at the session
    Thunk(ThunkFn<T>),
    /// Computed from the session data
    DataFn(DataFn<T>),
    /// Computed from the owning menu and the session data
    Method(MethodFn<T>),
}

impl<T> Resolvable<T> {
    pub fn thunk(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Resolvable::Thunk(Arc::new(f))
    }

    pub fn with_data(f: impl Fn(&Data) -> T + Send + Sync + 'static) -> Self {
        Resolvable::DataFn(Arc::new(f))
    }

    pub fn method(f: impl Fn(&MenuDefinition, &Data) -> T + Send + Sync + 'static) -> Self {
        Resolvable::Method(Arc::new(f))
    }

    pub fn as_literal(&self) -> Option<&T> {
        match self {
            Resolvable::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: From<String>> Resolvable<T> {
    pub fn template(template: impl Into<String>) -> Self {
        Resolvable::Template(template.into(), T::from)
    }
}

impl<T: Clone> Resolvable<T> {
    /// Produce the value for the current render of `menu`
    pub fn resolve(&self, menu: &MenuDefinition, data: &Data) -> Result<T, ResolveError> {
        match self {
            Resolvable::Literal(value) => Ok(value.clone()),
            Resolvable::Template(template, convert) => {
                render_template(template, menu, data).map(convert)
            }
            Resolvable::Thunk(f) => Ok(f()),
            Resolvable::DataFn(f) => Ok(f(data)),
            Resolvable::Method(f) => Ok(f(menu, data)),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Resolvable::Literal(value) => Resolvable::Literal(value.clone()),
            Resolvable::Template(template, convert) => {
                Resolvable::Template(template.clone(), *convert)
            }
            Resolvable::Thunk(f) => Resolvable::Thunk(Arc::clone(f)),
            Resolvable::DataFn(f) => Resolvable::DataFn(Arc::clone(f)),
            Resolvable::Method(f) => Resolvable::Method(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Resolvable::Template(template, _) => f.debug_tuple("Template").field(template).finish(),
            Resolvable::Thunk(_) => f.write_str("Thunk(..)"),
            Resolvable::DataFn(_) => f.write_str("DataFn(..)"),
            Resolvable::Method(_) => f.write_str("Method(..)"),
        }
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Resolvable::Literal(value)
    }
}

impl From<&str> for Resolvable<String> {
    fn from(value: &str) -> Self {
        Resolvable::Literal(value.to_string())
    }
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\}")
        .expect("placeholder pattern is valid")
});

/// Fill `{data.<path>}` and `{menu.<path>}` placeholders.
///
/// `data` is the whole session payload, `menu` is `{id, page, message_id,
/// data}` of the menu being rendered. Paths that lead nowhere render empty;
/// `{{` and `}}` are literal braces.
pub fn render_template(
    template: &str,
    menu: &MenuDefinition,
    data: &Data,
) -> Result<String, ResolveError> {
    let context = template_context(menu, data);
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(template.get(last..whole.start()).unwrap_or_default());
        last = whole.end();

        match (whole.as_str(), caps.get(1)) {
            ("{{", _) => out.push('{'),
            ("}}", _) => out.push('}'),
            (_, Some(path)) => {
                let path = path.as_str();
                let mut segments = path.split('.');
                let root = segments.next().unwrap_or_default();
                let Some(mut current) = context.get(root) else {
                    return Err(ResolveError::Template(path.to_string()));
                };
                let mut found = true;
                for segment in segments {
                    let next = match current {
                        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                        other => other.get(segment),
                    };
                    match next {
                        Some(value) => current = value,
                        None => {
                            found = false;
                            break;
                        }
                    }
                }
                if found {
                    out.push_str(&display_value(current));
                }
            }
            _ => {}
        }
    }

    out.push_str(template.get(last..).unwrap_or_default());
    Ok(out)
}

fn template_context(menu: &MenuDefinition, data: &Data) -> Value {
    let menu_data = data.menu(menu.id());
    json!({
        "data": serde_json::to_value(data).unwrap_or(Value::Null),
        "menu": {
            "id": menu.id(),
            "page": menu_data.map_or(0, |m| m.page),
            "message_id": menu_data.and_then(|m| m.message_id),
            "data": menu_data.map_or(Value::Null, |m| m.data.clone()),
        },
    })
}

/// Human readable form of a JSON value: strings unquoted, null empty
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
