//! chatflow-console - drive a menu flow from the terminal
//!
//! Every input line is a chat message of one session. `#<n>` presses button
//! `n` of the last keyboard, `#<token>` sends a raw callback token and
//! `photo:<file id>` sends a photo.

use chatflow::menu::{GotoButton, Markup, OutgoingMessage, SelectableButton, TextKind};
use chatflow::session::MessageId;
use chatflow::state_machine::{Attachment, AttachmentKind};
use chatflow::{
    ConsoleConfig, Event, Flow, MachineConfig, MemoryStore, MenuDefinition, MenuError, MenuRegistry, NavButton,
    SessionKey, SessionStore, SqliteStore, StateMachine, Transport, TransportError,
};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints messages to stdout and remembers the last keyboard
#[derive(Default)]
struct ConsoleTransport {
    next_id: Mutex<MessageId>,
    /// Callback tokens of the last keyboard with the message they belong to
    keyboard: Mutex<(Option<MessageId>, Vec<String>)>,
}

impl ConsoleTransport {
    fn print(&self, message_id: MessageId, message: &OutgoingMessage, edited: bool) -> Result<(), TransportError> {
        let mut out = io::stdout().lock();
        let marker = if edited { "edit" } else { "send" };
        let write = |out: &mut io::StdoutLock<'_>, line: String| {
            writeln!(out, "{line}").map_err(|e| TransportError::Failed(e.to_string()))
        };
        write(&mut out, format!("--- [{marker} #{message_id}]"))?;
        write(&mut out, message.text.trim_end().to_string())?;

        match &message.markup {
            Some(Markup::InlineKeyboard(rows)) => {
                let mut tokens = Vec::new();
                for row in rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|button| {
                            tokens.push(button.callback_data.clone());
                            format!("({}) {}", tokens.len(), button.label)
                        })
                        .collect();
                    write(&mut out, format!("  {}", cells.join("   ")))?;
                }
                let mut keyboard = self
                    .keyboard
                    .lock()
                    .map_err(|_| TransportError::Failed("keyboard lock poisoned".to_string()))?;
                *keyboard = (Some(message_id), tokens);
            }
            Some(Markup::ForceReply { .. }) => write(&mut out, "  (reply expected)".to_string())?,
            None => {}
        }
        Ok(())
    }

    /// Resolve `#<n>` or `#<token>` into a token and its message
    fn button(&self, input: &str) -> Option<(Option<MessageId>, String)> {
        let keyboard = self.keyboard.lock().ok()?;
        match input.parse::<usize>() {
            Ok(n) => keyboard
                .1
                .get(n.checked_sub(1)?)
                .map(|token| (keyboard.0, token.clone())),
            Err(_) => Some((keyboard.0, input.to_string())),
        }
    }
}

impl Transport for ConsoleTransport {
    fn send(&self, _key: &SessionKey, message: &OutgoingMessage) -> Result<MessageId, TransportError> {
        let message_id = {
            let mut next = self
                .next_id
                .lock()
                .map_err(|_| TransportError::Failed("id lock poisoned".to_string()))?;
            *next += 1;
            *next
        };
        self.print(message_id, message, false)?;
        Ok(message_id)
    }

    fn edit(
        &self,
        _key: &SessionKey,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        self.print(message_id, message, true)?;
        Ok(message_id)
    }

    fn answer_callback(&self, _query_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        if alert {
            if let Some(text) = text {
                println!("!!! {text}");
            }
        }
        Ok(())
    }
}

fn sample_menus() -> Result<MenuRegistry, MenuError> {
    let mut registry = MenuRegistry::new();
    registry
        .add(
            MenuDefinition::goto("MAIN", ["PROFILE", "PIZZA", "FEEDBACK"])
                .with_title("Main menu")
                .with_description("Pick a topic. /saved shows what you entered."),
        )?
        .add(
            MenuDefinition::goto(
                "PROFILE",
                [
                    GotoButton::new("NAME").with_save(None),
                    GotoButton::new("AGE").with_save(None),
                    GotoButton::new("EMAIL").with_save(None),
                    GotoButton::new("AVATAR").with_save(None),
                ],
            )
            .with_title("Profile")
            .with_back(NavButton::back()),
        )?
        .add(
            MenuDefinition::text_str("NAME")
                .with_title("Your name")
                .with_done(NavButton::done())
                .with_parse_success("Nice to meet you, {menu.data}!"),
        )?
        .add(
            MenuDefinition::text_int("AGE")
                .with_title("Your age")
                .with_done(NavButton::done())
                .with_parse_failure("Please send a whole number."),
        )?
        .add(
            MenuDefinition::text("EMAIL", TextKind::Email)
                .with_title("Your email")
                .with_cancel(NavButton::cancel()),
        )?
        .add(
            MenuDefinition::upload("AVATAR", AttachmentKind::Photo)
                .with_title("Send a photo")
                .with_done(NavButton::done()),
        )?
        .add(
            MenuDefinition::goto(
                "PIZZA",
                [
                    GotoButton::new("SIZE").with_save(None),
                    GotoButton::new("TOPPINGS").with_save(None),
                ],
            )
            .with_title("Pizza")
            .with_back(NavButton::back()),
        )?
        .add(
            MenuDefinition::radio(
                "SIZE",
                vec![
                    SelectableButton::new("Small", "s"),
                    SelectableButton::new("Medium", "m").selected(),
                    SelectableButton::new("Large", "l"),
                ],
            )
            .with_title("Size")
            .with_done(NavButton::done())
            .with_cancel(NavButton::cancel()),
        )?
        .add(
            MenuDefinition::checkbox(
                "TOPPINGS",
                ["Cheese", "Ham", "Mushrooms", "Olives", "Onions", "Pepper", "Pineapple", "Salami", "Spinach", "Tomato", "Tuna", "Corn"]
                    .iter()
                    .map(|name| SelectableButton::new(*name, name.to_lowercase()))
                    .collect(),
            )
            .with_title("Toppings")
            .with_done(NavButton::done())
            .with_cancel(NavButton::cancel()),
        )?
        .add(
            MenuDefinition::send("FEEDBACK")
                .with_title("Feedback")
                .with_description("Write anything, then /done."),
        )?;
    Ok(registry)
}

fn open_store(config: &ConsoleConfig) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => {
            tracing::info!(path = %path, "Using SQLite session store");
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::info!("Using in-memory session store");
            Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>
        }
    };
    Ok(store)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let console = ConsoleConfig::from_env();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "chatflow=info".into());
    if console.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }

    let registry = Arc::new(sample_menus()?);
    let mut machine = StateMachine::new(open_store(&console)?, MachineConfig::from_env());
    registry.install(&mut machine)?;

    let start = Arc::clone(&registry);
    machine.default_state_mut().on_command("start", move |turn, _| {
        start.show(turn, "MAIN")?;
        Ok(Flow::abort())
    });
    machine.default_state_mut().on_text(|turn, _| {
        turn.reply("Send /start to open the menu.");
        Ok(Flow::abort())
    });
    machine.all_state_mut().on_command("saved", |turn, _| {
        let saved = serde_json::to_string_pretty(&turn.data.saved_data).unwrap_or_default();
        turn.reply(saved);
        Ok(Flow::abort())
    });

    let transport = ConsoleTransport::default();
    let key = SessionKey::private(1);
    let mut presses = 0u64;
    println!("Type /start to begin, #<n> to press a button, Ctrl-D to quit.");

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = if let Some(input) = line.strip_prefix('#') {
            let Some((message_id, token)) = transport.button(input) else {
                println!("!!! No such button");
                continue;
            };
            presses += 1;
            Event::callback(key, presses.to_string(), token, message_id)
        } else if let Some(file_id) = line.strip_prefix("photo:") {
            Event::attachment(key, Attachment::new(AttachmentKind::Photo, file_id))
        } else {
            Event::text(key, line)
        };

        let outcome = machine.process(&event, &transport);
        tracing::debug!(state = %outcome.state, persisted = outcome.persisted, "Turn done");
    }
    Ok(())
}
