//! MIME message structure and generation.

use crate::content_type::{ContentType, parameter_value};
use crate::encoding::{encode_base64_lines, encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Transfer encoding types used for generated parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// A mailbox as written in an address header: `name <address>` or `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a mailbox with a display name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) if name.is_ascii() => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{} <{}>", encode_rfc2047(name, "utf-8"), self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// A file attached to a generated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to the recipient.
    pub filename: String,
    /// Content type of the data.
    pub content_type: ContentType,
    /// Raw (unencoded) data.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment, guessing the content type from the file name.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = ContentType::from_filename(&filename);
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Overrides the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Body of a MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Already transfer-encoded leaf content.
    Leaf(String),
    /// Nested parts separated by a boundary.
    Multipart {
        /// Boundary string (also present in the part's content type).
        boundary: String,
        /// Child parts.
        parts: Vec<Part>,
    },
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body.
    pub body: Body,
}

impl Part {
    /// Creates a quoted-printable text part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part headers cannot be built.
    pub fn text(content_type: &ContentType, text: &str) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        )?;
        Ok(Self {
            headers,
            body: Body::Leaf(encode_quoted_printable(text)),
        })
    }

    /// Creates a base64 attachment part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part headers cannot be built.
    pub fn attachment(attachment: &Attachment) -> Result<Self> {
        let filename = encode_rfc2047(&attachment.filename, "utf-8");
        let content_type = attachment
            .content_type
            .clone()
            .with_parameter("name", filename.clone());

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        headers.add(
            "Content-Disposition",
            format!("attachment; filename={}", parameter_value(&filename)),
        )?;
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::Base64.to_string(),
        )?;
        Ok(Self {
            headers,
            body: Body::Leaf(encode_base64_lines(&attachment.data)),
        })
    }

    /// Creates a multipart container.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type has no boundary.
    pub fn multipart(content_type: &ContentType, parts: Vec<Self>) -> Result<Self> {
        let boundary = content_type
            .boundary()
            .ok_or_else(|| Error::InvalidContentType(content_type.essence()))?
            .to_string();

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        Ok(Self {
            headers,
            body: Body::Multipart { boundary, parts },
        })
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Body::Leaf(content) => write!(f, "{content}\r\n"),
            Body::Multipart { boundary, parts } => {
                for part in parts {
                    write!(f, "--{boundary}\r\n")?;
                    write!(f, "{part}")?;
                }
                write!(f, "--{boundary}--\r\n")
            }
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.headers)?;
        self.write_body(f)
    }
}

/// A generated MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Top-level message headers (From, To, Subject, ...).
    pub headers: Headers,
    /// Root body part, carrying its own content headers.
    pub root: Part,
    recipients: Vec<String>,
}

impl Message {
    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Returns every envelope recipient (to, cc, bcc).
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headers)?;
        write!(f, "{}", self.root)
    }
}

/// Builder for [`Message`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    message_id: Option<String>,
    references: Vec<String>,
    extra: Vec<(String, String)>,
    text_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, mailbox: Mailbox) -> Self {
        self.from = Some(mailbox);
        self
    }

    /// Adds a primary recipient.
    #[must_use]
    pub fn to(mut self, mailbox: Mailbox) -> Self {
        self.to.push(mailbox);
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, mailbox: Mailbox) -> Self {
        self.cc.push(mailbox);
        self
    }

    /// Adds a BCC recipient. BCC recipients never appear in the headers.
    #[must_use]
    pub fn bcc(mut self, mailbox: Mailbox) -> Self {
        self.bcc.push(mailbox);
        self
    }

    /// Adds a Reply-To mailbox.
    #[must_use]
    pub fn reply_to(mut self, mailbox: Mailbox) -> Self {
        self.reply_to.push(mailbox);
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the Date header (defaults to the build time).
    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the Message-ID (angle brackets are added when missing).
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Adds a message id to the References header.
    #[must_use]
    pub fn reference(mut self, id: impl Into<String>) -> Self {
        self.references.push(id.into());
        self
    }

    /// Adds a free-form header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Uses a fixed multipart boundary instead of a random one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the message.
    ///
    /// A message with both text and HTML bodies becomes
    /// multipart/alternative; attachments wrap the body in multipart/mixed.
    ///
    /// # Errors
    ///
    /// Returns an error if no sender is set or a header is invalid.
    pub fn build(self) -> Result<Message> {
        let from = self
            .from
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;

        let mut headers = Headers::new();
        headers.add(
            "Date",
            self.date.unwrap_or_else(Utc::now).to_rfc2822(),
        )?;
        headers.add("From", from.to_string())?;
        add_mailboxes(&mut headers, "To", &self.to)?;
        add_mailboxes(&mut headers, "Cc", &self.cc)?;
        add_mailboxes(&mut headers, "Reply-To", &self.reply_to)?;
        if let Some(subject) = &self.subject {
            headers.add_text("Subject", subject)?;
        }
        if let Some(id) = &self.message_id {
            headers.add("Message-ID", bracketed(id))?;
        }
        if !self.references.is_empty() {
            let refs: Vec<String> = self.references.iter().map(String::as_str).map(bracketed).collect();
            headers.add("References", refs.join(" "))?;
        }
        for (name, value) in &self.extra {
            headers.add_text(name.as_str(), value)?;
        }
        headers.add("MIME-Version", "1.0")?;

        let boundary = self.boundary.unwrap_or_else(generate_boundary);

        let body = match (&self.text_body, &self.html_body) {
            (Some(text), Some(html)) => Part::multipart(
                &ContentType::multipart_alternative(format!("{boundary}-alt")),
                vec![
                    Part::text(&ContentType::text_plain(), text)?,
                    Part::text(&ContentType::text_html(), html)?,
                ],
            )?,
            (None, Some(html)) => Part::text(&ContentType::text_html(), html)?,
            (Some(text), None) => Part::text(&ContentType::text_plain(), text)?,
            (None, None) => Part::text(&ContentType::text_plain(), "")?,
        };

        let root = if self.attachments.is_empty() {
            body
        } else {
            let mut parts = vec![body];
            for attachment in &self.attachments {
                parts.push(Part::attachment(attachment)?);
            }
            Part::multipart(&ContentType::multipart_mixed(boundary), parts)?
        };

        let recipients = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|m| m.address.clone())
            .collect();

        Ok(Message {
            headers,
            root,
            recipients,
        })
    }
}

fn add_mailboxes(headers: &mut Headers, name: &str, mailboxes: &[Mailbox]) -> Result<()> {
    if mailboxes.is_empty() {
        return Ok(());
    }
    let value = mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    headers.add(name, value)
}

fn bracketed(id: &str) -> String {
    let id = id.trim();
    if id.starts_with('<') && id.ends_with('>') {
        id.to_string()
    } else {
        format!("<{id}>")
    }
}

fn generate_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("=_{token}")
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

    fn base() -> MessageBuilder {
        MessageBuilder::new()
            .from(Mailbox::new("sender@example.com"))
            .to(Mailbox::with_name("Recipient", "recipient@example.com"))
            .subject("Test")
            .boundary("BOUNDARY")
    }

    #[test]
    fn test_mailbox_display() {
        assert_eq!(Mailbox::new("a@x.com").to_string(), "a@x.com");
        assert_eq!(
            Mailbox::with_name("Alice", "a@x.com").to_string(),
            "\"Alice\" <a@x.com>"
        );
        assert_eq!(Mailbox::with_name("", "a@x.com").to_string(), "a@x.com");
        assert!(
            Mailbox::with_name("Zoë", "z@x.com")
                .to_string()
                .starts_with("=?utf-8?B?")
        );
    }

    #[test]
    fn test_build_requires_from() {
        let result = MessageBuilder::new().to(Mailbox::new("a@x.com")).build();
        assert!(matches!(result, Err(Error::MissingHeader(_))));
    }

    #[test]
    fn test_single_text_part() {
        let message = base().text_body("Hello").build().unwrap();
        let raw = message.to_string();

        assert_eq!(message.subject(), Some("Test"));
        assert!(raw.contains("From: sender@example.com\r\n"));
        assert!(raw.contains("To: \"Recipient\" <recipient@example.com>\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(raw.ends_with("\r\n\r\nHello\r\n"));
    }

    #[test]
    fn test_alternative_parts() {
        let message = base()
            .text_body("Plain")
            .html_body("<p>Rich</p>")
            .build()
            .unwrap();
        let raw = message.to_string();

        assert!(raw.contains("multipart/alternative; boundary=BOUNDARY-alt"));
        assert!(raw.contains("--BOUNDARY-alt\r\n"));
        assert!(raw.contains("--BOUNDARY-alt--\r\n"));
        assert!(raw.contains("<p>Rich</p>"));
    }

    #[test]
    fn test_attachment_wraps_in_mixed() {
        let message = base()
            .text_body("See attached")
            .attach(Attachment::new("doc.pdf", b"%PDF".to_vec()))
            .build()
            .unwrap();
        let raw = message.to_string();

        assert!(raw.contains("multipart/mixed; boundary=BOUNDARY"));
        assert!(raw.contains("Content-Type: application/pdf; name=doc.pdf"));
        assert!(raw.contains("Content-Disposition: attachment; filename=doc.pdf"));
        assert!(raw.contains("JVBERg=="));
        assert!(raw.contains("--BOUNDARY--\r\n"));
    }

    #[test]
    fn test_attachment_name_with_quotes() {
        let message = base()
            .text_body("x")
            .attach(Attachment::new("say \"hi\".txt", b"hi".to_vec()))
            .build()
            .unwrap();
        let raw = message.to_string();

        assert!(raw.contains("Content-Type: text/plain; name=\"say \\\"hi\\\".txt\"\r\n"));
        assert!(raw.contains("Content-Disposition: attachment; filename=\"say \\\"hi\\\".txt\"\r\n"));
    }

    #[test]
    fn test_bcc_not_in_headers() {
        let message = base()
            .bcc(Mailbox::new("hidden@example.com"))
            .text_body("x")
            .build()
            .unwrap();

        assert!(!message.to_string().contains("hidden@example.com"));
        assert_eq!(
            message.recipients(),
            ["recipient@example.com", "hidden@example.com"]
        );
    }

    #[test]
    fn test_message_id_and_references_bracketed() {
        let message = base()
            .message_id("abc@example.com")
            .reference("<r1@example.com>")
            .reference("r2@example.com")
            .text_body("x")
            .build()
            .unwrap();

        assert_eq!(message.message_id(), Some("<abc@example.com>"));
        assert_eq!(
            message.headers.get("References"),
            Some("<r1@example.com> <r2@example.com>")
        );
    }

    #[test]
    fn test_generated_boundary_is_random() {
        assert_ne!(generate_boundary(), generate_boundary());
    }
}
