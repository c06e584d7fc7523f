//! The assembled message handed to the delivery layer.

use serde::Serialize;

use crate::attachment::Attachment;
use crate::content::Content;
use crate::envelope::Envelope;
use crate::headers::Headers;

/// Queue routing applied to a message before it is queued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueOptions {
    /// Queue connection name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Queue name on the connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    /// Dispatch only after the surrounding transaction commits.
    pub after_commit: bool,
}

/// A fully assembled message.
///
/// Built fresh by every `send`, `queue` and `render` call. Later changes to
/// the client never affect a message that was already built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MailMessage {
    /// Routing and metadata.
    pub envelope: Envelope,
    /// Body representations and template variables.
    pub content: Content,
    /// Attachments, in the order they were added.
    pub attachments: Vec<Attachment>,
    /// Custom headers.
    pub headers: Headers,
    /// Queue routing.
    pub queue: QueueOptions,
}

impl MailMessage {
    /// Creates a message from its assembled parts.
    #[must_use]
    pub fn new(
        envelope: Envelope,
        content: Content,
        attachments: Vec<Attachment>,
        headers: Headers,
    ) -> Self {
        Self {
            envelope,
            content,
            attachments,
            headers,
            queue: QueueOptions::default(),
        }
    }

    /// Routes the message to a queue connection.
    #[must_use]
    pub fn on_connection(mut self, connection: impl Into<String>) -> Self {
        self.queue.connection = Some(connection.into());
        self
    }

    /// Routes the message to a named queue.
    #[must_use]
    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue.queue = Some(queue.into());
        self
    }

    /// Marks the message for dispatch after the transaction commits.
    #[must_use]
    pub fn after_commit(mut self) -> Self {
        self.queue.after_commit = true;
        self
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
    use serde_json::json;

    #[test]
    fn test_queue_options() {
        let message = MailMessage::default()
            .on_connection("redis")
            .on_queue("emails")
            .after_commit();

        assert_eq!(message.queue.connection.as_deref(), Some("redis"));
        assert_eq!(message.queue.queue.as_deref(), Some("emails"));
        assert!(message.queue.after_commit);
    }

    #[test]
    fn test_serialize_empty_message() {
        assert_eq!(
            serde_json::to_value(MailMessage::default()).unwrap(),
            json!({
                "envelope": {},
                "content": {},
                "attachments": [],
                "headers": {},
                "queue": { "after_commit": false }
            })
        );
    }
}
