//! Attachment descriptors.
//!
//! An [`Attachment`] only describes where its bytes come from. Reading the
//! file, the storage disk, or calling the data producer is left to the
//! transport at send time.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AttachmentError;
use crate::storage::StorageManager;

/// A deferred source of attachment bytes.
#[derive(Clone)]
pub struct DataProducer(Arc<dyn Fn() -> Vec<u8> + Send + Sync>);

impl DataProducer {
    /// Wraps a closure producing the attachment bytes.
    pub fn new(producer: impl Fn() -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self(Arc::new(producer))
    }

    /// Invokes the producer.
    #[must_use]
    pub fn produce(&self) -> Vec<u8> {
        (self.0)()
    }
}

impl fmt::Debug for DataProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataProducer(..)")
    }
}

impl PartialEq for DataProducer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source_kind", rename_all = "snake_case")]
pub enum AttachmentSource {
    /// A file on the local filesystem.
    Path {
        /// Filesystem path.
        path: PathBuf,
    },
    /// A file on a storage disk.
    Storage {
        /// Path relative to the disk root.
        path: String,
        /// Disk name; the default disk when `None`.
        #[serde(skip_serializing_if = "Option::is_none")]
        disk: Option<String>,
    },
    /// Bytes produced on demand.
    Data {
        /// Producer invoked by the transport.
        #[serde(skip)]
        producer: DataProducer,
    },
}

/// An attachment descriptor, optionally renamed and with an explicit MIME type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    /// Source of the bytes.
    #[serde(flatten)]
    pub source: AttachmentSource,
    /// File name presented to the recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl Attachment {
    fn from_source(source: AttachmentSource) -> Self {
        Self {
            source,
            name: None,
            mime: None,
        }
    }

    /// Attaches a file from the local filesystem.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::from_source(AttachmentSource::Path { path: path.into() })
    }

    /// Attaches a file from the default storage disk.
    #[must_use]
    pub fn from_storage(path: impl Into<String>) -> Self {
        Self::from_source(AttachmentSource::Storage {
            path: path.into(),
            disk: None,
        })
    }

    /// Attaches a file from a named storage disk.
    #[must_use]
    pub fn from_storage_disk(path: impl Into<String>, disk: impl Into<String>) -> Self {
        Self::from_source(AttachmentSource::Storage {
            path: path.into(),
            disk: Some(disk.into()),
        })
    }

    /// Attaches bytes produced by `producer` when the message is sent.
    #[must_use]
    pub fn from_data(producer: impl Fn() -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self::from_source(AttachmentSource::Data {
            producer: DataProducer::new(producer),
        })
    }

    /// Renames the attachment. Empty names are ignored.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }

    /// Overrides the content type. Empty values are ignored.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        if !mime.is_empty() {
            self.mime = Some(mime);
        }
        self
    }

    /// Applies optional rename and MIME overrides.
    #[must_use]
    pub fn with_overrides(self, name: Option<&str>, mime: Option<&str>) -> Self {
        let this = match name {
            Some(name) => self.named(name),
            None => self,
        };
        match mime {
            Some(mime) => this.with_mime(mime),
            None => this,
        }
    }

    /// File name presented to the recipient.
    ///
    /// Falls back to the last path segment, or `attachment` for data.
    #[must_use]
    pub fn file_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }

        let fallback = match &self.source {
            AttachmentSource::Path { path } => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            AttachmentSource::Storage { path, .. } => Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            AttachmentSource::Data { .. } => None,
        };
        fallback.unwrap_or_else(|| "attachment".to_string())
    }

    /// Reads the attachment bytes.
    ///
    /// Only transports call this: it touches the filesystem, the storage
    /// disks, or the data producer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or storage entry cannot be read.
    pub fn read(&self, storage: &StorageManager) -> Result<Vec<u8>, AttachmentError> {
        match &self.source {
            AttachmentSource::Path { path } => {
                std::fs::read(path).map_err(|source| AttachmentError::Read {
                    path: path.clone(),
                    source,
                })
            }
            AttachmentSource::Storage { path, disk } => {
                Ok(storage.resolve(path, disk.as_deref())?)
            }
            AttachmentSource::Data { producer } => Ok(producer.produce()),
        }
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
    use crate::storage::MemoryDisk;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_overrides_applied_only_when_non_empty() {
        let attachment = Attachment::from_path("/tmp/f.pdf").with_overrides(Some(""), Some(""));
        assert!(attachment.name.is_none());
        assert!(attachment.mime.is_none());

        let attachment =
            Attachment::from_path("/tmp/f.pdf").with_overrides(Some("doc.pdf"), Some("application/pdf"));
        assert_eq!(attachment.name.as_deref(), Some("doc.pdf"));
        assert_eq!(attachment.mime.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_file_name_fallbacks() {
        assert_eq!(Attachment::from_path("/tmp/report.csv").file_name(), "report.csv");
        assert_eq!(Attachment::from_storage("a/b/photo.png").file_name(), "photo.png");
        assert_eq!(Attachment::from_data(Vec::new).file_name(), "attachment");
        assert_eq!(
            Attachment::from_data(Vec::new).named("x.bin").file_name(),
            "x.bin"
        );
    }

    #[test]
    fn test_data_producer_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let attachment = Attachment::from_data(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            b"payload".to_vec()
        });

        let copy = attachment.clone();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(copy, attachment);

        let data = attachment.read(&StorageManager::default()).unwrap();
        assert_eq!(data, b"payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_from_storage_disks() {
        let reports = MemoryDisk::new();
        reports.put("q1.csv", "a,b");
        let storage = StorageManager::new("reports").with_disk("reports", reports);

        let default_disk = Attachment::from_storage("q1.csv");
        assert_eq!(default_disk.read(&storage).unwrap(), b"a,b");

        let named = Attachment::from_storage_disk("q1.csv", "archive");
        assert!(matches!(
            named.read(&storage),
            Err(AttachmentError::Storage(_))
        ));
    }

    #[test]
    fn test_read_missing_path() {
        let attachment = Attachment::from_path("/nonexistent/mailpost/file.pdf");
        assert!(matches!(
            attachment.read(&StorageManager::default()),
            Err(AttachmentError::Read { .. })
        ));
    }

    #[test]
    fn test_serialize_shapes() {
        let path = Attachment::from_path("/tmp/f.pdf").named("doc.pdf");
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            json!({ "source_kind": "path", "path": "/tmp/f.pdf", "name": "doc.pdf" })
        );

        let disk = Attachment::from_storage_disk("a.txt", "s3").with_mime("text/plain");
        assert_eq!(
            serde_json::to_value(&disk).unwrap(),
            json!({ "source_kind": "storage", "path": "a.txt", "disk": "s3", "mime": "text/plain" })
        );

        let data = Attachment::from_data(Vec::new);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({ "source_kind": "data" })
        );
    }
}
