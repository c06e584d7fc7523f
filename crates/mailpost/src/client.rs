//! Fluent mail client.
//!
//! A [`MailClient`] accumulates sender, recipient, body, attachment and
//! header settings through chainable `&mut self` setters. Nothing is built
//! until [`MailClient::send`], [`MailClient::queue`] or
//! [`MailClient::render`] is called; each call assembles a fresh
//! [`MailMessage`] from the current settings. Settings are kept after
//! dispatch, so the same client can send the same message again.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::address::Address;
use crate::attachment::Attachment;
use crate::config::ConfigProvider;
use crate::content::{Content, ContentFields};
use crate::envelope::{Envelope, EnvelopeFields, MetadataValue, non_empty};
use crate::error::{DeliveryError, QueueError, RenderError};
use crate::headers::{HeaderFields, Headers};
use crate::manager::{MailManager, PendingMail};
use crate::message::MailMessage;
use crate::queue::Delay;

/// Builder for one outbound message and its delivery options.
///
/// ```ignore
/// let mut client = MailClient::new(manager, config);
/// client
///     .set_recipient_address("b@x.com")
///     .set_subject("Hi")
///     .set_view("welcome")
///     .add_attachment_from_path("/tmp/f.pdf", Some("doc.pdf"), None);
/// client.send()?;
/// ```
#[derive(Clone)]
pub struct MailClient {
    manager: Arc<MailManager>,
    config: Arc<dyn ConfigProvider>,

    driver: Option<String>,
    locale: Option<String>,
    queue_connection: Option<String>,
    queue_name: Option<String>,
    after_commit: bool,

    envelope: EnvelopeFields,
    content: ContentFields,
    attachments: Vec<Attachment>,
    headers: HeaderFields,
}

impl MailClient {
    /// Creates an empty client.
    ///
    /// `config` supplies the default sender when none is set.
    #[must_use]
    pub fn new(manager: Arc<MailManager>, config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            manager,
            config,
            driver: None,
            locale: None,
            queue_connection: None,
            queue_name: None,
            after_commit: false,
            envelope: EnvelopeFields::default(),
            content: ContentFields::default(),
            attachments: Vec::new(),
            headers: HeaderFields::default(),
        }
    }

    // Delivery options

    /// Mailer name; the manager's default when unset.
    #[must_use]
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Selects the mailer.
    pub fn set_driver(&mut self, driver: impl Into<String>) -> &mut Self {
        self.driver = Some(driver.into());
        self
    }

    /// Locale the message is rendered in.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Sets the locale.
    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = Some(locale.into());
        self
    }

    /// Queue connection used by [`MailClient::queue`].
    #[must_use]
    pub fn queue_connection(&self) -> Option<&str> {
        self.queue_connection.as_deref()
    }

    /// Sets the queue connection.
    pub fn set_queue_connection(&mut self, connection: impl Into<String>) -> &mut Self {
        self.queue_connection = Some(connection.into());
        self
    }

    /// Queue name used by [`MailClient::queue`].
    #[must_use]
    pub fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref()
    }

    /// Sets the queue name.
    pub fn set_queue_name(&mut self, queue: impl Into<String>) -> &mut Self {
        self.queue_name = Some(queue.into());
        self
    }

    /// Whether queued mail waits for the surrounding transaction to commit.
    #[must_use]
    pub const fn after_commit(&self) -> bool {
        self.after_commit
    }

    /// Sets the after-commit flag.
    pub const fn set_after_commit(&mut self, after_commit: bool) -> &mut Self {
        self.after_commit = after_commit;
        self
    }

    // Envelope

    /// Sender address, or the configured default when unset.
    #[must_use]
    pub fn sender_address(&self) -> Option<String> {
        self.envelope.sender_address(self.config.as_ref())
    }

    /// Sets the sender address.
    pub fn set_sender_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.envelope.sender_address = Some(address.into());
        self
    }

    /// Sender name, or the configured default when unset.
    #[must_use]
    pub fn sender_name(&self) -> Option<String> {
        self.envelope.sender_name(self.config.as_ref())
    }

    /// Sets the sender name.
    pub fn set_sender_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.envelope.sender_name = Some(name.into());
        self
    }

    /// Recipient address.
    #[must_use]
    pub fn recipient_address(&self) -> Option<&str> {
        self.envelope.recipient_address.as_deref()
    }

    /// Sets the recipient address.
    pub fn set_recipient_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.envelope.recipient_address = Some(address.into());
        self
    }

    /// Recipient name.
    #[must_use]
    pub fn recipient_name(&self) -> Option<&str> {
        self.envelope.recipient_name.as_deref()
    }

    /// Sets the recipient name.
    pub fn set_recipient_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.envelope.recipient_name = Some(name.into());
        self
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.envelope.subject.as_deref()
    }

    /// Sets the subject line.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.envelope.subject = Some(subject.into());
        self
    }

    /// Carbon copy recipients.
    #[must_use]
    pub fn cc(&self) -> &[Address] {
        &self.envelope.cc
    }

    /// Replaces the carbon copy recipients.
    pub fn set_cc(&mut self, cc: Vec<Address>) -> &mut Self {
        self.envelope.cc = cc;
        self
    }

    /// Appends a carbon copy recipient.
    pub fn add_cc(&mut self, address: impl Into<Address>) -> &mut Self {
        self.envelope.cc.push(address.into());
        self
    }

    /// Blind carbon copy recipients.
    #[must_use]
    pub fn bcc(&self) -> &[Address] {
        &self.envelope.bcc
    }

    /// Replaces the blind carbon copy recipients.
    pub fn set_bcc(&mut self, bcc: Vec<Address>) -> &mut Self {
        self.envelope.bcc = bcc;
        self
    }

    /// Appends a blind carbon copy recipient.
    pub fn add_bcc(&mut self, address: impl Into<Address>) -> &mut Self {
        self.envelope.bcc.push(address.into());
        self
    }

    /// Reply-to addresses.
    #[must_use]
    pub fn reply_to(&self) -> &[Address] {
        &self.envelope.reply_to
    }

    /// Replaces the reply-to addresses.
    pub fn set_reply_to(&mut self, reply_to: Vec<Address>) -> &mut Self {
        self.envelope.reply_to = reply_to;
        self
    }

    /// Appends a reply-to address.
    pub fn add_reply_to(&mut self, address: impl Into<Address>) -> &mut Self {
        self.envelope.reply_to.push(address.into());
        self
    }

    /// Tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.envelope.tags
    }

    /// Replaces the tags.
    pub fn set_tags(&mut self, tags: Vec<String>) -> &mut Self {
        self.envelope.tags = tags;
        self
    }

    /// Appends a tag.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.envelope.tags.push(tag.into());
        self
    }

    /// Provider metadata.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.envelope.metadata
    }

    /// Replaces the metadata.
    pub fn set_metadata(&mut self, metadata: BTreeMap<String, MetadataValue>) -> &mut Self {
        self.envelope.metadata = metadata;
        self
    }

    /// Inserts a metadata pair, replacing an earlier value for the key.
    pub fn add_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> &mut Self {
        self.envelope.metadata.insert(key.into(), value.into());
        self
    }

    // Content

    /// View name.
    #[must_use]
    pub fn view(&self) -> Option<&str> {
        self.content.view.as_deref()
    }

    /// Sets the view name.
    pub fn set_view(&mut self, view: impl Into<String>) -> &mut Self {
        self.content.view = Some(view.into());
        self
    }

    /// Raw HTML body.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.content.html.as_deref()
    }

    /// Sets the raw HTML body.
    pub fn set_html(&mut self, html: impl Into<String>) -> &mut Self {
        self.content.html = Some(html.into());
        self
    }

    /// Plain text body.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.text.as_deref()
    }

    /// Sets the plain text body.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.content.text = Some(text.into());
        self
    }

    /// Markdown source.
    #[must_use]
    pub fn markdown(&self) -> Option<&str> {
        self.content.markdown.as_deref()
    }

    /// Sets the markdown source.
    pub fn set_markdown(&mut self, markdown: impl Into<String>) -> &mut Self {
        self.content.markdown = Some(markdown.into());
        self
    }

    /// Pre-rendered HTML string.
    #[must_use]
    pub fn html_string(&self) -> Option<&str> {
        self.content.html_string.as_deref()
    }

    /// Sets the pre-rendered HTML string.
    pub fn set_html_string(&mut self, html: impl Into<String>) -> &mut Self {
        self.content.html_string = Some(html.into());
        self
    }

    /// Template variables.
    #[must_use]
    pub const fn with(&self) -> &BTreeMap<String, Value> {
        &self.content.with
    }

    /// Replaces the template variables.
    pub fn set_with(&mut self, with: BTreeMap<String, Value>) -> &mut Self {
        self.content.with = with;
        self
    }

    /// Inserts a template variable.
    pub fn add_with(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.content.with.insert(key.into(), value.into());
        self
    }

    // Attachments

    /// Attachments, in the order they were added.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Replaces all attachments.
    pub fn set_attachments(&mut self, attachments: Vec<Attachment>) -> &mut Self {
        self.attachments = attachments;
        self
    }

    /// Appends an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Appends a file from the local filesystem.
    ///
    /// `name` and `mime` are applied only when non-empty.
    pub fn add_attachment_from_path(
        &mut self,
        path: impl Into<PathBuf>,
        name: Option<&str>,
        mime: Option<&str>,
    ) -> &mut Self {
        self.add_attachment(Attachment::from_path(path).with_overrides(name, mime))
    }

    /// Appends a file from the default storage disk.
    pub fn add_attachment_from_storage(
        &mut self,
        path: impl Into<String>,
        name: Option<&str>,
        mime: Option<&str>,
    ) -> &mut Self {
        self.add_attachment(Attachment::from_storage(path).with_overrides(name, mime))
    }

    /// Appends a file from a named storage disk.
    pub fn add_attachment_from_storage_disk(
        &mut self,
        path: impl Into<String>,
        disk: impl Into<String>,
        name: Option<&str>,
        mime: Option<&str>,
    ) -> &mut Self {
        self.add_attachment(Attachment::from_storage_disk(path, disk).with_overrides(name, mime))
    }

    /// Appends bytes produced by `producer` when the message is delivered.
    pub fn add_attachment_from_data(
        &mut self,
        producer: impl Fn() -> Vec<u8> + Send + Sync + 'static,
        name: Option<&str>,
        mime: Option<&str>,
    ) -> &mut Self {
        self.add_attachment(Attachment::from_data(producer).with_overrides(name, mime))
    }

    // Headers

    /// Message-ID.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.message_id.as_deref()
    }

    /// Sets the Message-ID.
    pub fn set_message_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.headers.message_id = Some(id.into());
        self
    }

    /// Referenced message ids.
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.headers.references
    }

    /// Replaces the referenced message ids.
    pub fn set_references(&mut self, references: Vec<String>) -> &mut Self {
        self.headers.references = references;
        self
    }

    /// Appends a referenced message id.
    pub fn add_reference(&mut self, id: impl Into<String>) -> &mut Self {
        self.headers.references.push(id.into());
        self
    }

    /// Free-form text headers.
    #[must_use]
    pub const fn text_headers(&self) -> &BTreeMap<String, String> {
        &self.headers.text
    }

    /// Replaces the text headers.
    pub fn set_text_headers(&mut self, headers: BTreeMap<String, String>) -> &mut Self {
        self.headers.text = headers;
        self
    }

    /// Inserts a text header, replacing an earlier value for the name.
    pub fn add_text_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.headers.text.insert(name.into(), value.into());
        self
    }

    // Assembly

    /// Assembles the envelope from the current settings.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        self.envelope.assemble(self.config.as_ref())
    }

    /// Assembles the content from the current settings.
    #[must_use]
    pub fn content(&self) -> Content {
        self.content.assemble()
    }

    /// Assembles the custom headers from the current settings.
    #[must_use]
    pub fn headers(&self) -> Headers {
        self.headers.assemble()
    }

    /// Assembles a fresh message from the current settings.
    #[must_use]
    pub fn message(&self) -> MailMessage {
        MailMessage::new(
            self.envelope(),
            self.content(),
            self.attachments.clone(),
            self.headers(),
        )
    }

    fn pending(&self) -> PendingMail<'_> {
        let pending = self.manager.mailer(non_empty(self.driver.as_deref()));
        match non_empty(self.locale.as_deref()) {
            Some(locale) => pending.locale(locale),
            None => pending,
        }
    }

    // Dispatch

    /// Sends the message synchronously through the selected mailer.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub fn send(&self) -> Result<(), DeliveryError> {
        let message = self.message();
        debug!(
            "Sending mail to {:?} via {:?}",
            message.envelope.to.as_ref().map(Address::address),
            self.driver
        );
        self.pending().send(&message)
    }

    /// Renders the HTML body without sending.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error unchanged.
    pub fn render(&self) -> Result<String, RenderError> {
        self.pending().render(&self.message())
    }

    /// Queues the message, immediately when `delay` is `None` and after
    /// `delay` otherwise.
    ///
    /// The queue connection and name are applied when set, and the
    /// after-commit flag when true.
    ///
    /// # Errors
    ///
    /// Returns the queue's error unchanged.
    pub fn queue(&self, delay: Option<Delay>) -> Result<(), QueueError> {
        let mut message = self.message();
        if let Some(connection) = non_empty(self.queue_connection.as_deref()) {
            message = message.on_connection(connection);
        }
        if let Some(queue) = non_empty(self.queue_name.as_deref()) {
            message = message.on_queue(queue);
        }
        if self.after_commit {
            message = message.after_commit();
        }

        debug!(
            "Queueing mail to {:?} (delay {:?})",
            message.envelope.to.as_ref().map(Address::address),
            delay
        );
        let pending = self.pending();
        match delay {
            None => pending.queue(message),
            Some(delay) => pending.later(delay, message),
        }
    }
}

impl fmt::Debug for MailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailClient")
            .field("driver", &self.driver)
            .field("locale", &self.locale)
            .field("queue_connection", &self.queue_connection)
            .field("queue_name", &self.queue_name)
            .field("after_commit", &self.after_commit)
            .field("envelope", &self.envelope)
            .field("content", &self.content)
            .field("attachments", &self.attachments)
            .field("headers", &self.headers)
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
    use crate::config::{FROM_ADDRESS, FROM_NAME};
    use std::collections::HashMap;

    fn client() -> MailClient {
        let mut config = HashMap::new();
        config.insert(FROM_ADDRESS.to_string(), "default@x.com".to_string());
        config.insert(FROM_NAME.to_string(), "Default".to_string());
        MailClient::new(Arc::new(MailManager::default()), Arc::new(config))
    }

    #[test]
    fn test_new_client_is_empty() {
        let client = client();
        assert!(client.driver().is_none());
        assert!(!client.after_commit());
        assert!(client.attachments().is_empty());
        assert_eq!(client.sender_address().as_deref(), Some("default@x.com"));
        assert_eq!(client.sender_name().as_deref(), Some("Default"));
    }

    #[test]
    fn test_setters_chain() {
        let mut client = client();
        client
            .set_driver("array")
            .set_locale("fr")
            .set_sender_address("a@x.com")
            .set_recipient_address("b@x.com")
            .set_recipient_name("Bob")
            .set_subject("Hi")
            .add_tag("welcome")
            .add_with("name", "Bob")
            .add_text_header("X-Campaign", "spring");

        assert_eq!(client.driver(), Some("array"));
        assert_eq!(client.locale(), Some("fr"));
        assert_eq!(client.sender_address().as_deref(), Some("a@x.com"));
        assert_eq!(client.recipient_name(), Some("Bob"));
        assert_eq!(client.tags(), ["welcome"]);
        assert_eq!(client.with()["name"], Value::from("Bob"));
        assert_eq!(client.text_headers()["X-Campaign"], "spring");
    }

    #[test]
    fn test_default_mailer_sends_free_form_metadata() {
        let mut client = client();
        client
            .set_recipient_address("b@x.com")
            .set_text("hello")
            .add_metadata("user id", 1)
            .add_metadata("campaign:spring", "yes");

        client.send().unwrap();
    }

    #[test]
    fn test_message_reflects_current_state() {
        let mut client = client();
        client.set_subject("First");
        let first = client.message();
        client.set_subject("Second");
        let second = client.message();

        assert_eq!(first.envelope.subject.as_deref(), Some("First"));
        assert_eq!(second.envelope.subject.as_deref(), Some("Second"));
        assert_eq!(second.queue, crate::message::QueueOptions::default());
    }

    #[test]
    fn test_sender_name_fallback_is_independent() {
        let mut client = client();
        client.set_sender_address("a@x.com");

        let envelope = client.envelope();
        assert_eq!(envelope.from, Some(Address::named("a@x.com", "Default")));
    }
}
