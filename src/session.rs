//! Per-conversation session payload
//!
//! A session is identified by a [`SessionKey`] and carries one [`Data`]
//! value that is loaded at the start of a turn and persisted at its end.

mod data;
mod key;

pub use data::{Data, MenuData, MessageId};
pub use key::SessionKey;
