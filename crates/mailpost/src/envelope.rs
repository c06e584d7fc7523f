//! Routing and metadata portion of a message.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::address::Address;
use crate::config::{ConfigProvider, FROM_ADDRESS, FROM_NAME};

/// A metadata value: either text or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Text value.
    Text(String),
    /// Integer value.
    Int(i64),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

/// Assembled envelope handed to the delivery layer.
///
/// Absent values are `None` and empty lists are empty; both are skipped
/// when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Envelope {
    /// Sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Primary recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Subject line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Carbon copy recipients, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Address>,
    /// Blind carbon copy recipients, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Address>,
    /// Reply-to addresses, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reply_to: Vec<Address>,
    /// Tags, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Provider metadata.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Envelope {
    /// Registers one metadata pair, replacing an earlier value for the key.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Envelope fields as configured on a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeFields {
    pub(crate) sender_address: Option<String>,
    pub(crate) sender_name: Option<String>,
    pub(crate) recipient_address: Option<String>,
    pub(crate) recipient_name: Option<String>,
    pub(crate) subject: Option<String>,
    pub(crate) cc: Vec<Address>,
    pub(crate) bcc: Vec<Address>,
    pub(crate) reply_to: Vec<Address>,
    pub(crate) tags: Vec<String>,
    pub(crate) metadata: BTreeMap<String, MetadataValue>,
}

impl EnvelopeFields {
    /// Sender address, falling back to the configured default when unset.
    pub fn sender_address(&self, config: &dyn ConfigProvider) -> Option<String> {
        non_empty(self.sender_address.as_deref())
            .map(str::to_string)
            .or_else(|| config.get(FROM_ADDRESS))
    }

    /// Sender name, falling back to the configured default when unset.
    pub fn sender_name(&self, config: &dyn ConfigProvider) -> Option<String> {
        non_empty(self.sender_name.as_deref())
            .map(str::to_string)
            .or_else(|| config.get(FROM_NAME))
    }

    /// Builds an [`Envelope`] from the current fields.
    ///
    /// Nothing is validated: a missing sender or recipient simply leaves the
    /// corresponding field out.
    #[must_use]
    pub fn assemble(&self, config: &dyn ConfigProvider) -> Envelope {
        let mut envelope = Envelope::default();

        if let Some(address) = self.sender_address(config).filter(|a| !a.is_empty()) {
            envelope.from = Some(Address::new(address).with_name(self.sender_name(config)));
        }

        if let Some(address) = non_empty(self.recipient_address.as_deref()) {
            envelope.to = Some(Address::new(address).with_name(self.recipient_name.clone()));
        }

        envelope.subject = non_empty(self.subject.as_deref()).map(str::to_string);
        envelope.cc.clone_from(&self.cc);
        envelope.bcc.clone_from(&self.bcc);
        envelope.reply_to.clone_from(&self.reply_to);
        envelope.tags.clone_from(&self.tags);

        // One registration per pair
        for (key, value) in &self.metadata {
            envelope = envelope.metadata(key.as_str(), value.clone());
        }

        envelope
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
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
    use std::collections::HashMap;

    fn config(address: Option<&str>, name: Option<&str>) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(address) = address {
            map.insert(FROM_ADDRESS.to_string(), address.to_string());
        }
        if let Some(name) = name {
            map.insert(FROM_NAME.to_string(), name.to_string());
        }
        map
    }

    #[test]
    fn test_empty_fields_assemble_empty_envelope() {
        let envelope = EnvelopeFields::default().assemble(&config(None, None));
        assert_eq!(envelope, Envelope::default());
    }

    #[test]
    fn test_sender_falls_back_to_config() {
        let fields = EnvelopeFields::default();
        let config = config(Some("default@example.com"), Some("Default"));

        let envelope = fields.assemble(&config);
        assert_eq!(
            envelope.from,
            Some(Address::named("default@example.com", "Default"))
        );
    }

    #[test]
    fn test_explicit_sender_wins() {
        let fields = EnvelopeFields {
            sender_address: Some("me@example.com".to_string()),
            ..EnvelopeFields::default()
        };
        let config = config(Some("default@example.com"), None);

        assert_eq!(
            fields.sender_address(&config).as_deref(),
            Some("me@example.com")
        );
        assert_eq!(
            fields.assemble(&config).from,
            Some(Address::new("me@example.com"))
        );
    }

    #[test]
    fn test_empty_sender_address_is_unset() {
        let fields = EnvelopeFields {
            sender_address: Some(String::new()),
            ..EnvelopeFields::default()
        };
        let config = config(Some("default@example.com"), None);
        assert_eq!(
            fields.sender_address(&config).as_deref(),
            Some("default@example.com")
        );
    }

    #[test]
    fn test_missing_recipient_is_omitted() {
        let fields = EnvelopeFields {
            recipient_name: Some("Nobody".to_string()),
            subject: Some(String::new()),
            ..EnvelopeFields::default()
        };
        let envelope = fields.assemble(&config(None, None));
        assert!(envelope.to.is_none());
        assert!(envelope.subject.is_none());
    }

    #[test]
    fn test_recipient_with_empty_name() {
        let fields = EnvelopeFields {
            recipient_address: Some("b@x.com".to_string()),
            recipient_name: Some(String::new()),
            ..EnvelopeFields::default()
        };
        let envelope = fields.assemble(&config(None, None));
        assert_eq!(envelope.to, Some(Address::new("b@x.com")));
    }

    #[test]
    fn test_metadata_registration_last_wins() {
        let envelope = Envelope::default()
            .metadata("user_id", 1)
            .metadata("user_id", 2)
            .metadata("plan", "pro");

        assert_eq!(envelope.metadata["user_id"], MetadataValue::Int(2));
        assert_eq!(envelope.metadata["plan"], MetadataValue::from("pro"));
    }

    #[test]
    fn test_serialize_skips_empty() {
        let fields = EnvelopeFields {
            recipient_address: Some("b@x.com".to_string()),
            tags: vec!["welcome".to_string()],
            ..EnvelopeFields::default()
        };
        let json = serde_json::to_value(fields.assemble(&config(None, None))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "to": { "address": "b@x.com" }, "tags": ["welcome"] })
        );
    }

    #[test]
    fn test_metadata_value_serializes_untagged() {
        let envelope = Envelope::default().metadata("id", 7).metadata("kind", "x");
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(json, serde_json::json!({ "metadata": { "id": 7, "kind": "x" } }));
    }
}
