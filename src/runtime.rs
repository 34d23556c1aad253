//! Runtime side of a turn: delivering effects to the chat platform

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{deliver, Delivery, DeliveryFailure};
pub use traits::{Transport, TransportError};
