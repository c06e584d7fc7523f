//! Mail configuration.
//!
//! The client never reads process-wide settings directly: defaults such as
//! the global sender come from a [`ConfigProvider`] handed to it at
//! construction. [`MailConfig`] is the file/env backed implementation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Key of the default sender address.
pub const FROM_ADDRESS: &str = "mail.from.address";
/// Key of the default sender name.
pub const FROM_NAME: &str = "mail.from.name";
/// Key of the default mailer name.
pub const DEFAULT_MAILER: &str = "mail.default";

/// Source of process-wide mail defaults.
pub trait ConfigProvider: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Transport backing a configured mailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Keeps sent messages in memory.
    Array,
    /// Writes the generated MIME message to the log.
    Log,
}

/// A named mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Transport used by this mailer.
    pub transport: TransportKind,
}

/// Global sender defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromConfig {
    /// Default sender address.
    pub address: Option<String>,
    /// Default sender name.
    pub name: Option<String>,
}

/// A named local storage disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Directory all paths on the disk are relative to.
    pub root: PathBuf,
}

/// Driver of a queue connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueDriver {
    /// In-process queue.
    #[default]
    Memory,
}

/// A named queue connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue driver.
    #[serde(default)]
    pub driver: QueueDriver,
}

/// Mail configuration, typically loaded from a JSON file.
///
/// ```json
/// {
///   "default": "log",
///   "from": { "address": "hello@example.com", "name": "Example" },
///   "mailers": { "log": { "transport": "log" } },
///   "default_disk": "local",
///   "disks": { "local": { "root": "storage/app" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Name of the mailer used when a client selects no driver.
    pub default: String,
    /// Global sender defaults.
    pub from: FromConfig,
    /// Named mailers.
    pub mailers: BTreeMap<String, MailerConfig>,
    /// Name of the disk used by storage attachments without a disk name.
    pub default_disk: String,
    /// Named storage disks.
    pub disks: BTreeMap<String, DiskConfig>,
    /// Name of the queue connection used when a message names none.
    pub default_queue: String,
    /// Named queue connections.
    pub queues: BTreeMap<String, QueueConfig>,
}

impl Default for MailConfig {
    fn default() -> Self {
        let mut mailers = BTreeMap::new();
        mailers.insert(
            "log".to_string(),
            MailerConfig {
                transport: TransportKind::Log,
            },
        );
        mailers.insert(
            "array".to_string(),
            MailerConfig {
                transport: TransportKind::Array,
            },
        );

        let mut disks = BTreeMap::new();
        disks.insert(
            "local".to_string(),
            DiskConfig {
                root: PathBuf::from("storage/app"),
            },
        );

        let mut queues = BTreeMap::new();
        queues.insert("default".to_string(), QueueConfig::default());

        Self {
            default: "log".to_string(),
            from: FromConfig::default(),
            mailers,
            default_disk: "local".to_string(),
            disks,
            default_queue: "default".to_string(),
            queues,
        }
    }
}

impl MailConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// default mailer is not configured.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded mail config from {:?}", path);
        Ok(config)
    }

    /// Builds the default configuration overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlays `MAIL_MAILER`, `MAIL_FROM_ADDRESS` and `MAIL_FROM_NAME`.
    ///
    /// Empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(mailer) = lookup("MAIL_MAILER") {
            self.default = mailer;
        }
        if let Some(address) = lookup("MAIL_FROM_ADDRESS") {
            self.from.address = Some(address);
        }
        if let Some(name) = lookup("MAIL_FROM_NAME") {
            self.from.name = Some(name);
        }
    }

    /// Checks that the default mailer refers to a configured mailer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDefaultMailer`] otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailers.contains_key(&self.default) {
            Ok(())
        } else {
            Err(ConfigError::MissingDefaultMailer(self.default.clone()))
        }
    }
}

impl ConfigProvider for MailConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            FROM_ADDRESS => self.from.address.clone(),
            FROM_NAME => self.from.name.clone(),
            DEFAULT_MAILER => Some(self.default.clone()),
            _ => None,
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

    #[test]
    fn test_default_config() {
        let config = MailConfig::default();
        assert_eq!(config.default, "log");
        assert!(config.validate().is_ok());
        assert_eq!(config.get(DEFAULT_MAILER).as_deref(), Some("log"));
        assert!(config.get(FROM_ADDRESS).is_none());
    }

    #[test]
    fn test_parse_partial_json_keeps_defaults() {
        let config: MailConfig = serde_json::from_str(
            r#"{ "from": { "address": "hello@example.com", "name": "Example" } }"#,
        )
        .unwrap();

        assert_eq!(config.get(FROM_ADDRESS).as_deref(), Some("hello@example.com"));
        assert_eq!(config.get(FROM_NAME).as_deref(), Some("Example"));
        assert_eq!(config.default, "log");
        assert!(config.mailers.contains_key("array"));
    }

    #[test]
    fn test_parse_mailers() {
        let config: MailConfig = serde_json::from_str(
            r#"{ "default": "test", "mailers": { "test": { "transport": "array" } } }"#,
        )
        .unwrap();

        assert_eq!(config.mailers["test"].transport, TransportKind::Array);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_default() {
        let config = MailConfig {
            default: "smtp".to_string(),
            ..MailConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDefaultMailer(name)) if name == "smtp"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("mailpost-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "from": { "address": "file@example.com" } }"#).unwrap();

        let config = MailConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.from.address.as_deref(), Some("file@example.com"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = MailConfig::load("/nonexistent/mailpost.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let path = std::env::temp_dir().join(format!("mailpost-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();

        let result = MailConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_apply_env() {
        let env: HashMap<String, String> = [
            ("MAIL_MAILER", "array"),
            ("MAIL_FROM_ADDRESS", "env@example.com"),
            ("MAIL_FROM_NAME", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = MailConfig::default();
        config.from.name = Some("Kept".to_string());
        config.apply_env(|key| env.get(key).cloned());

        assert_eq!(config.default, "array");
        assert_eq!(config.from.address.as_deref(), Some("env@example.com"));
        assert_eq!(config.from.name.as_deref(), Some("Kept"));
    }

    #[test]
    fn test_hashmap_provider() {
        let mut map = HashMap::new();
        map.insert(FROM_ADDRESS.to_string(), "map@example.com".to_string());
        let provider: &dyn ConfigProvider = &map;
        assert_eq!(provider.get(FROM_ADDRESS).as_deref(), Some("map@example.com"));
        assert!(provider.get(FROM_NAME).is_none());
    }
}
