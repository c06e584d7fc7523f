//! Transports that deliver assembled messages.

mod array;
mod log;

pub use array::{ArrayTransport, SentMessage};
pub use log::LogTransport;

use crate::error::DeliveryError;
use crate::message::MailMessage;

/// Delivers a message synchronously.
pub trait Transport: Send + Sync {
    /// Sends `message`, rendered for `locale` when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be delivered.
    fn send(&self, message: &MailMessage, locale: Option<&str>) -> Result<(), DeliveryError>;
}
