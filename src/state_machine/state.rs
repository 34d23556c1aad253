//! States and their handler tables

use super::event::{Event, EventKind};
use super::turn::{Flow, HandlerError, Turn};
use std::fmt;
use std::sync::Arc;

pub type HandlerResult = Result<Flow, HandlerError>;

/// An event handler. Gets the turn of the session and the event.
pub type Handler = Arc<dyn Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync>;

/// Which events a handler is interested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every event
    Any,
    /// `/name`, optionally addressed to the configured bot
    Command(String),
    /// Messages with text that is not a command
    Text,
    /// Any message
    Message,
    /// Button presses
    Callback,
}

impl Filter {
    pub fn matches(&self, event: &Event, bot_username: Option<&str>) -> bool {
        match (self, &event.kind) {
            (Filter::Any, _)
            | (Filter::Message, EventKind::Message(_))
            | (Filter::Callback, EventKind::Callback(_)) => true,
            (Filter::Command(name), EventKind::Message(msg)) => msg
                .command(bot_username)
                .is_some_and(|cmd| cmd.name == name),
            (Filter::Text, EventKind::Message(msg)) => msg.plain_text().is_some(),
            _ => false,
        }
    }
}

/// A named mode of a session with its own handlers, run in registration
/// order
#[derive(Clone)]
pub struct State {
    name: String,
    handlers: Vec<(Filter, Handler)>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn on(
        &mut self,
        filter: Filter,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.push((filter, Arc::new(handler)));
        self
    }

    pub fn on_command(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on(Filter::Command(name.into()), handler)
    }

    pub fn on_text(
        &mut self,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on(Filter::Text, handler)
    }

    pub fn on_message(
        &mut self,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on(Filter::Message, handler)
    }

    pub fn on_callback(
        &mut self,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on(Filter::Callback, handler)
    }

    pub fn on_event(
        &mut self,
        handler: impl Fn(&mut Turn<'_>, &Event) -> HandlerResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.on(Filter::Any, handler)
    }

    /// Handlers interested in `event`, in registration order
    pub fn handlers_for<'s>(
        &'s self,
        event: &'s Event,
        bot_username: Option<&'s str>,
    ) -> impl Iterator<Item = &'s Handler> + 's {
        self.handlers
            .iter()
            .filter(move |(filter, _)| filter.matches(event, bot_username))
            .map(|(_, handler)| handler)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field(
                "filters",
                &self.handlers.iter().map(|(filter, _)| filter).collect::<Vec<_>>(),
            )
            .finish()
    }
}
