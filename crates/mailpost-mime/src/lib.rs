//! # mailpost-mime
//!
//! MIME message generation for outbound email.
//!
//! ## Features
//!
//! - **Message generation**: RFC 5322 headers with multipart bodies
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//! - **Content types**: parameters, parsing, guessing from file names
//! - **Multipart**: mixed (attachments) and alternative (text + HTML)
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_mime::{Attachment, Mailbox, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from(Mailbox::new("sender@example.com"))
//!     .to(Mailbox::with_name("Recipient", "recipient@example.com"))
//!     .subject("Document")
//!     .text_body("Please find the attached document.")
//!     .html_body("<p>Please find the attached document.</p>")
//!     .attach(Attachment::new("document.pdf", bytes))
//!     .build()?;
//!
//! println!("{message}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Attachment, Body, Mailbox, Message, MessageBuilder, Part, TransferEncoding};
