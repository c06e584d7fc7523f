//! Storage disks that storage-sourced attachments are read from.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::MailConfig;
use crate::error::StorageError;

/// A storage backend addressed by relative paths.
pub trait Storage: Send + Sync {
    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Disk rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    /// Creates a disk rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for LocalDisk {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.full_path(path)?;
        std::fs::read(&full_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_string())
            } else {
                StorageError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }
}

/// In-memory disk, mostly useful in tests.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDisk {
    /// Creates an empty disk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` at `path`, replacing any previous file.
    pub fn put(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let mut files = self
            .files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files.insert(path.into(), data.into());
    }
}

impl Storage for MemoryDisk {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let files = self
            .files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

/// Named disks with a default.
#[derive(Clone)]
pub struct StorageManager {
    default_disk: String,
    disks: BTreeMap<String, Arc<dyn Storage>>,
}

impl StorageManager {
    /// Creates a manager whose default disk is `default_disk`.
    #[must_use]
    pub fn new(default_disk: impl Into<String>) -> Self {
        Self {
            default_disk: default_disk.into(),
            disks: BTreeMap::new(),
        }
    }

    /// Builds local disks from configuration.
    #[must_use]
    pub fn from_config(config: &MailConfig) -> Self {
        let mut manager = Self::new(config.default_disk.clone());
        for (name, disk) in &config.disks {
            manager = manager.with_disk(name.clone(), LocalDisk::new(disk.root.clone()));
        }
        manager
    }

    /// Registers a disk under `name`.
    #[must_use]
    pub fn with_disk(mut self, name: impl Into<String>, disk: impl Storage + 'static) -> Self {
        self.disks.insert(name.into(), Arc::new(disk));
        self
    }

    /// Returns the default disk name.
    #[must_use]
    pub fn default_disk(&self) -> &str {
        &self.default_disk
    }

    /// Returns the disk registered under `name`, or the default disk.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownDisk`] if no such disk exists.
    pub fn disk(&self, name: Option<&str>) -> Result<&dyn Storage, StorageError> {
        let name = name.unwrap_or(self.default_disk.as_str());
        self.disks
            .get(name)
            .map(|disk| disk.as_ref())
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    /// Reads `path` from the named disk, or the default disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk is unknown or the read fails.
    pub fn resolve(&self, path: &str, disk: Option<&str>) -> Result<Vec<u8>, StorageError> {
        self.disk(disk)?.get(path)
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new("local")
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("default_disk", &self.default_disk)
            .field("disks", &self.disks.keys().collect::<Vec<_>>())
            .finish()
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

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("mailpost-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(root.join("invoices")).unwrap();
        root
    }

    #[test]
    fn test_local_disk_reads_relative_path() {
        let root = temp_root("disk-read");
        std::fs::write(root.join("invoices/1.pdf"), b"%PDF-1").unwrap();

        let disk = LocalDisk::new(&root);
        assert_eq!(disk.get("invoices/1.pdf").unwrap(), b"%PDF-1");
        assert_eq!(disk.get("/invoices/1.pdf").unwrap(), b"%PDF-1");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_local_disk_rejects_escape() {
        let disk = LocalDisk::new("/srv/storage");
        assert!(matches!(
            disk.get("../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(disk.get(""), Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_local_disk_missing_file() {
        let root = temp_root("disk-missing");
        let disk = LocalDisk::new(&root);
        assert!(matches!(
            disk.get("invoices/none.pdf"),
            Err(StorageError::NotFound(_))
        ));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_manager_resolves_default_and_named() {
        let local = MemoryDisk::new();
        local.put("a.txt", "local");
        let s3 = MemoryDisk::new();
        s3.put("a.txt", "remote");

        let manager = StorageManager::new("local")
            .with_disk("local", local)
            .with_disk("s3", s3);

        assert_eq!(manager.resolve("a.txt", None).unwrap(), b"local");
        assert_eq!(manager.resolve("a.txt", Some("s3")).unwrap(), b"remote");
        assert!(matches!(
            manager.resolve("a.txt", Some("gcs")),
            Err(StorageError::UnknownDisk(name)) if name == "gcs"
        ));
    }

    #[test]
    fn test_manager_from_config() {
        let manager = StorageManager::from_config(&MailConfig::default());
        assert_eq!(manager.default_disk(), "local");
        assert!(manager.disk(None).is_ok());
    }
}
