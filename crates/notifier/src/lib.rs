//! Notification dispatcher.
//!
//! Validates a notification request, fans it out to the email, WhatsApp
//! and Telegram handlers, and aggregates the per-channel outcomes.

pub mod aggregator;
pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod telegram;
pub mod validation;
pub mod whatsapp;

#[cfg(test)]
mod testing;

pub use aggregator::{DispatchOutcome, Verdict};
pub use channel::{ChannelHandler, DeliveryError, SkipReason};
pub use dispatcher::Dispatcher;
pub use validation::validate;
