//! Error types for mail operations.
//!
//! Each dispatch operation has its own error type so that a failure from the
//! transport, renderer, or queue reaches the caller as that collaborator
//! reported it.

use std::io;
use std::path::PathBuf;

/// Errors raised while sending a message.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No transport is registered under the requested mailer name.
    #[error("Mailer [{0}] is not defined")]
    UnknownMailer(String),

    /// The transport refused the message.
    #[error("Transport rejected message: {0}")]
    Rejected(String),

    /// An attachment could not be read.
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// The body could not be rendered for delivery.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The MIME message could not be generated.
    #[error("MIME error: {0}")]
    Mime(#[from] mailpost_mime::Error),
}

/// Errors raised while rendering a message body.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No transport is registered under the requested mailer name.
    #[error("Mailer [{0}] is not defined")]
    UnknownMailer(String),

    /// The referenced view does not exist.
    #[error("View [{0}] not found")]
    ViewNotFound(String),

    /// The message has no body representation at all.
    #[error("Message has no body to render")]
    EmptyBody,

    /// The rendering engine failed.
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Errors raised while queueing a message.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No transport is registered under the requested mailer name.
    #[error("Mailer [{0}] is not defined")]
    UnknownMailer(String),

    /// No queue is registered under the requested connection name.
    #[error("Queue connection [{0}] is not defined")]
    UnknownConnection(String),

    /// The queue refused the job.
    #[error("Queue rejected job: {0}")]
    Rejected(String),
}

/// Errors raised by storage disks.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No disk is registered under the requested name.
    #[error("Disk [{0}] does not have a configured driver")]
    UnknownDisk(String),

    /// The path escapes the disk root or is otherwise unusable.
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    /// The file does not exist on the disk.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Reading from the disk failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while resolving attachment data.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    /// A filesystem attachment could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Path of the attachment.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A storage attachment could not be resolved.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configuration file is not valid JSON for [`crate::MailConfig`].
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The default mailer is not among the configured mailers.
    #[error("Default mailer [{0}] is not configured")]
    MissingDefaultMailer(String),
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Delivery failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Queueing failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
