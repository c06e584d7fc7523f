//! Transport that writes generated MIME text to the log.

use std::sync::Arc;

use mailpost_mime::{ContentType, Mailbox, MessageBuilder};

use super::Transport;
use crate::error::DeliveryError;
use crate::message::MailMessage;
use crate::render::Renderer;
use crate::storage::StorageManager;

/// Transport that writes the generated MIME message to the log.
///
/// Useful in development: nothing leaves the process, but attachments are
/// resolved and the body is rendered exactly as a network transport would.
#[derive(Clone)]
pub struct LogTransport {
    renderer: Arc<dyn Renderer>,
    storage: Arc<StorageManager>,
}

impl LogTransport {
    /// Creates a transport rendering with `renderer` and reading storage
    /// attachments from `storage`.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, storage: Arc<StorageManager>) -> Self {
        Self { renderer, storage }
    }

    /// Builds the MIME message for `message`.
    ///
    /// Tags become `X-Tag` headers and metadata becomes `X-Metadata-{key}`
    /// headers. Key characters that cannot appear in a header name are
    /// replaced with `-`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be rendered, an attachment cannot
    /// be read, or the message has no sender.
    pub fn build(
        &self,
        message: &MailMessage,
        locale: Option<&str>,
    ) -> Result<mailpost_mime::Message, DeliveryError> {
        let envelope = &message.envelope;
        let mut builder = MessageBuilder::new();

        if let Some(from) = &envelope.from {
            builder = builder.from(Mailbox::from(from));
        }
        if let Some(to) = &envelope.to {
            builder = builder.to(Mailbox::from(to));
        }
        for address in &envelope.cc {
            builder = builder.cc(Mailbox::from(address));
        }
        for address in &envelope.bcc {
            builder = builder.bcc(Mailbox::from(address));
        }
        for address in &envelope.reply_to {
            builder = builder.reply_to(Mailbox::from(address));
        }
        if let Some(subject) = &envelope.subject {
            builder = builder.subject(subject.as_str());
        }

        for tag in &envelope.tags {
            builder = builder.header("X-Tag", tag.as_str());
        }
        for (key, value) in &envelope.metadata {
            builder = builder.header(metadata_header(key), value.to_string());
        }

        let headers = &message.headers;
        if let Some(id) = &headers.message_id {
            builder = builder.message_id(id.as_str());
        }
        for reference in &headers.references {
            builder = builder.reference(reference.as_str());
        }
        for (name, value) in &headers.text {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let content = &message.content;
        if let Some(text) = &content.text {
            builder = builder.text_body(text.as_str());
        }
        let has_html = content.html_string.is_some()
            || content.html.is_some()
            || content.view.is_some()
            || content.markdown.is_some();
        if has_html {
            builder = builder.html_body(self.renderer.render(message, locale)?);
        }

        for attachment in &message.attachments {
            let data = attachment.read(&self.storage)?;
            let mut part = mailpost_mime::Attachment::new(attachment.file_name(), data);
            if let Some(mime) = &attachment.mime {
                part = part.with_content_type(ContentType::parse(mime)?);
            }
            builder = builder.attach(part);
        }

        Ok(builder.build()?)
    }
}

fn metadata_header(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != ':' { c } else { '-' })
        .collect();
    format!("X-Metadata-{key}")
}

impl Transport for LogTransport {
    fn send(&self, message: &MailMessage, locale: Option<&str>) -> Result<(), DeliveryError> {
        let mime = self.build(message, locale)?;
        tracing::info!(
            "Logged message {:?} to {} recipient(s)\n{}",
            mime.subject().unwrap_or_default(),
            mime.recipients().len(),
            mime
        );
        Ok(())
    }
}

impl std::fmt::Debug for LogTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTransport")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
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
    use crate::address::Address;
    use crate::attachment::Attachment;
    use crate::error::AttachmentError;
    use crate::render::BasicRenderer;
    use crate::storage::MemoryDisk;

    fn transport() -> LogTransport {
        let disk = MemoryDisk::new();
        disk.put("invoices/1.pdf", "%PDF-1.4");
        let storage = StorageManager::new("local").with_disk("local", disk);
        let renderer = BasicRenderer::new().with_view("welcome", "<h1>Welcome</h1>");
        LogTransport::new(Arc::new(renderer), Arc::new(storage))
    }

    fn message() -> MailMessage {
        let mut message = MailMessage::default();
        message.envelope.from = Some(Address::named("a@x.com", "Alice"));
        message.envelope.to = Some(Address::new("b@x.com"));
        message.envelope.cc.push(Address::new("c@x.com"));
        message.envelope.subject = Some("Hi".to_string());
        message
    }

    #[test]
    fn test_build_text_and_view() {
        let mut message = message();
        message.content.view = Some("welcome".to_string());
        message.content.text = Some("Welcome".to_string());

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("From: \"Alice\" <a@x.com>\r\n"));
        assert!(mime.contains("To: b@x.com\r\n"));
        assert!(mime.contains("Subject: Hi\r\n"));
        assert!(mime.contains("multipart/alternative"));
        assert!(mime.contains("<h1>Welcome</h1>"));
    }

    #[test]
    fn test_build_tags_metadata_and_headers() {
        let mut message = message();
        message.envelope.tags.push("welcome".to_string());
        message.envelope = message.envelope.metadata("user_id", 7);
        message.headers.message_id = Some("id-1@x.com".to_string());
        message.headers.references.push("id-0@x.com".to_string());
        message
            .headers
            .text
            .insert("X-Campaign".to_string(), "spring".to_string());
        message.content.text = Some("body".to_string());

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("X-Tag: welcome\r\n"));
        assert!(mime.contains("X-Metadata-user_id: 7\r\n"));
        assert!(mime.contains("Message-ID: <id-1@x.com>\r\n"));
        assert!(mime.contains("References: <id-0@x.com>\r\n"));
        assert!(mime.contains("X-Campaign: spring\r\n"));
    }

    #[test]
    fn test_metadata_keys_become_valid_header_names() {
        let mut message = message();
        message.envelope = message
            .envelope
            .metadata("user id", 1)
            .metadata("campaign:spring", "yes")
            .metadata("région", "eu");
        message.content.text = Some("body".to_string());

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("X-Metadata-user-id: 1\r\n"));
        assert!(mime.contains("X-Metadata-campaign-spring: yes\r\n"));
        assert!(mime.contains("X-Metadata-r-gion: eu\r\n"));
        transport().send(&message, None).unwrap();
    }

    #[test]
    fn test_custom_header_casing_is_kept() {
        let mut message = message();
        message
            .headers
            .text
            .insert("X-MyHeader".to_string(), "v".to_string());
        message.content.text = Some("body".to_string());

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("X-MyHeader: v\r\n"));
    }

    #[test]
    fn test_quoted_attachment_name() {
        let mut message = message();
        message.content.text = Some("body".to_string());
        message
            .attachments
            .push(Attachment::from_data(|| b"hi".to_vec()).named("say \"hi\".txt"));

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("name=\"say \\\"hi\\\".txt\""));
        assert!(mime.contains("filename=\"say \\\"hi\\\".txt\""));
    }

    #[test]
    fn test_build_resolves_attachments() {
        let mut message = message();
        message.content.text = Some("see attached".to_string());
        message
            .attachments
            .push(Attachment::from_storage("invoices/1.pdf").named("invoice.pdf"));
        message.attachments.push(
            Attachment::from_data(|| b"a,b".to_vec())
                .named("report.csv")
                .with_mime("text/csv"),
        );

        let mime = transport().build(&message, None).unwrap().to_string();
        assert!(mime.contains("multipart/mixed"));
        assert!(mime.contains("invoice.pdf"));
        assert!(mime.contains("application/pdf"));
        assert!(mime.contains("text/csv"));
    }

    #[test]
    fn test_missing_attachment_fails() {
        let mut message = message();
        message
            .attachments
            .push(Attachment::from_storage("invoices/missing.pdf"));

        let result = transport().build(&message, None);
        assert!(matches!(
            result,
            Err(DeliveryError::Attachment(AttachmentError::Storage(_)))
        ));
    }

    #[test]
    fn test_missing_sender_fails() {
        let mut message = message();
        message.envelope.from = None;
        message.content.text = Some("body".to_string());

        let result = transport().send(&message, None);
        assert!(matches!(result, Err(DeliveryError::Mime(_))));
    }

    #[test]
    fn test_unknown_view_fails() {
        let mut message = message();
        message.content.view = Some("missing".to_string());

        let result = transport().send(&message, None);
        assert!(matches!(result, Err(DeliveryError::Render(_))));
    }
}
