//! Effect delivery
//!
//! Runs the effects of one turn in order and records the message ids the
//! transport hands back into the session data, so later turns edit the
//! right message.

use super::traits::{Transport, TransportError};
use crate::menu::OutgoingMessage;
use crate::session::{Data, MessageId, SessionKey};
use crate::state_machine::{Effect, RenderMode};
use std::collections::HashMap;

/// An effect the transport rejected
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub effect: Effect,
    pub error: TransportError,
}

#[derive(Debug, Default)]
pub struct Delivery {
    pub delivered: Vec<Effect>,
    pub failures: Vec<DeliveryFailure>,
}

struct Executor<'a> {
    key: &'a SessionKey,
    transport: &'a dyn Transport,
    /// Messages rendered this turn, by menu id
    rendered: HashMap<String, MessageId>,
    delivery: Delivery,
}

/// Deliver `effects` for the session `key`
pub fn deliver(
    key: &SessionKey,
    effects: Vec<Effect>,
    data: &mut Data,
    transport: &dyn Transport,
) -> Delivery {
    let mut executor = Executor {
        key,
        transport,
        rendered: HashMap::new(),
        delivery: Delivery::default(),
    };
    for effect in effects {
        executor.run(effect, data);
    }
    executor.delivery
}

impl Executor<'_> {
    fn run(&mut self, effect: Effect, data: &mut Data) {
        let result = match &effect {
            Effect::Render {
                menu,
                mode,
                message,
            } => match mode {
                RenderMode::Send => self.send_menu(menu, message, data),
                RenderMode::Edit { message_id, reuse } => {
                    let target = message_id
                        .or_else(|| reuse.as_ref().and_then(|m| self.rendered.get(m).copied()))
                        .or_else(|| self.rendered.get(menu).copied());
                    self.edit_menu(menu, target, message, data)
                }
                RenderMode::Finalize { message_id } => {
                    let target = message_id.or_else(|| self.rendered.get(menu).copied());
                    self.finalize(menu, target, message);
                    return;
                }
            },
            Effect::Reply { text } => self
                .transport
                .send(self.key, &OutgoingMessage::plain(text.clone()))
                .map(|_| ()),
            Effect::AnswerCallback {
                query_id,
                text,
                alert,
            } => self
                .transport
                .answer_callback(query_id, text.as_deref(), *alert),
        };

        match result {
            Ok(()) => self.delivery.delivered.push(effect),
            Err(error) => {
                tracing::warn!(session = %self.key, error = %error, "Failed to deliver effect");
                self.delivery.failures.push(DeliveryFailure { effect, error });
            }
        }
    }

    fn send_menu(&mut self, menu: &str, message: &OutgoingMessage, data: &mut Data) -> Result<(), TransportError> {
        let id = self.transport.send(self.key, message)?;
        self.record(menu, id, data);
        Ok(())
    }

    fn edit_menu(
        &mut self,
        menu: &str,
        target: Option<MessageId>,
        message: &OutgoingMessage,
        data: &mut Data,
    ) -> Result<(), TransportError> {
        let Some(message_id) = target else {
            tracing::debug!(session = %self.key, menu = %menu, "No message to edit, sending");
            return self.send_menu(menu, message, data);
        };
        match self.transport.edit(self.key, message_id, message) {
            Ok(id) => {
                self.record(menu, id, data);
                Ok(())
            }
            Err(TransportError::MessageGone(_)) => {
                tracing::debug!(session = %self.key, menu = %menu, message_id, "Message gone, sending");
                self.send_menu(menu, message, data)
            }
            Err(e) => Err(e),
        }
    }

    fn finalize(&mut self, menu: &str, target: Option<MessageId>, message: &OutgoingMessage) {
        let Some(message_id) = target else {
            tracing::debug!(session = %self.key, menu = %menu, "Nothing to finalize");
            return;
        };
        if let Err(e) = self.transport.edit(self.key, message_id, message) {
            tracing::debug!(session = %self.key, menu = %menu, error = %e, "Could not finalize menu message");
        }
    }

    fn record(&mut self, menu: &str, message_id: MessageId, data: &mut Data) {
        self.rendered.insert(menu.to_string(), message_id);
        if let Some(menu_data) = data.menu_mut(menu) {
            menu_data.message_id = Some(message_id);
        }
    }
}
