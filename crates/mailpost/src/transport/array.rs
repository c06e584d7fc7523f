//! In-memory transport that records every message it is given.

use std::sync::Mutex;

use super::Transport;
use crate::error::DeliveryError;
use crate::message::MailMessage;

/// A message recorded by an [`ArrayTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// The message as it was handed to the transport.
    pub message: MailMessage,
    /// Locale it was sent with.
    pub locale: Option<String>,
}

/// Transport that keeps every sent message in memory.
#[derive(Debug, Default)]
pub struct ArrayTransport {
    sent: Mutex<Vec<SentMessage>>,
}

impl ArrayTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sent messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of sent messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets all sent messages.
    pub fn flush(&self) {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl Transport for ArrayTransport {
    fn send(&self, message: &MailMessage, locale: Option<&str>) -> Result<(), DeliveryError> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sent.push(SentMessage {
            message: message.clone(),
            locale: locale.map(str::to_string),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_records_messages_with_locale() {
        let transport = ArrayTransport::new();
        assert!(transport.is_empty());

        let mut message = MailMessage::default();
        message.envelope.subject = Some("Hi".to_string());
        transport.send(&message, None).unwrap();
        transport.send(&message, Some("fr")).unwrap();

        let sent = transport.messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message, message);
        assert!(sent[0].locale.is_none());
        assert_eq!(sent[1].locale.as_deref(), Some("fr"));

        transport.flush();
        assert!(transport.is_empty());
    }
}
