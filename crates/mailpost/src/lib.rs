//! # mailpost
//!
//! Fluent builder for outbound email.
//!
//! This crate provides:
//! - [`MailClient`], a chainable builder for sender, recipients, body,
//!   attachments and headers
//! - Assembly of the builder state into a [`MailMessage`], with the sender
//!   falling back to configured defaults
//! - Synchronous send, render and queue entry points routed through a
//!   [`MailManager`]
//! - Built-in `array` and `log` transports, a view-based renderer, an
//!   in-memory queue and storage disks for attachments
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mailpost::{MailClient, MailConfig, MailManager, BasicRenderer};
//!
//! let config = Arc::new(MailConfig::load("mail.json")?);
//! let manager = Arc::new(MailManager::from_config(&config, Arc::new(BasicRenderer::new())));
//!
//! let mut client = MailClient::new(manager, config);
//! client
//!     .set_recipient_address("b@x.com")
//!     .set_subject("Hi")
//!     .set_text("Hello!");
//! client.send()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod client;
pub mod config;
mod content;
mod envelope;
mod error;
mod headers;
mod manager;
mod message;
pub mod queue;
mod render;
pub mod storage;
pub mod transport;

pub use address::Address;
pub use attachment::{Attachment, AttachmentSource, DataProducer};
pub use client::MailClient;
pub use config::{ConfigProvider, MailConfig};
pub use content::{Content, ContentFields};
pub use envelope::{Envelope, EnvelopeFields, MetadataValue};
pub use error::{
    AttachmentError, ConfigError, DeliveryError, Error, QueueError, RenderError, Result,
    StorageError,
};
pub use headers::{HeaderFields, Headers};
pub use manager::{MailManager, PendingMail};
pub use message::{MailMessage, QueueOptions};
pub use queue::{Delay, MemoryQueue, Queue, QueuedMail};
pub use render::{BasicRenderer, Renderer};
pub use storage::{LocalDisk, MemoryDisk, Storage, StorageManager};
pub use transport::{ArrayTransport, LogTransport, SentMessage, Transport};
