//! Email address with optional display name.

use serde::Serialize;
use std::fmt;

/// An email address plus an optional display name.
///
/// The address is not validated; malformed values are passed through to the
/// transport, which is free to reject them at send time. An empty display
/// name is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Address {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(address).with_name(Some(name.into()))
    }

    /// Sets the display name, keeping it only when it is non-empty.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.is_empty());
        self
    }

    /// Returns the email address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl From<&Address> for mailpost_mime::Mailbox {
    fn from(address: &Address) -> Self {
        match address.name() {
            Some(name) => Self::with_name(name, address.address()),
            None => Self::new(address.address()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "{}", self.address),
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
    fn test_address_only() {
        let address = Address::new("user@example.com");
        assert_eq!(address.address(), "user@example.com");
        assert!(address.name().is_none());
        assert_eq!(address.to_string(), "user@example.com");
    }

    #[test]
    fn test_named_address() {
        let address = Address::named("john@example.com", "John Doe");
        assert_eq!(address.name(), Some("John Doe"));
        assert_eq!(address.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_empty_name_is_absent() {
        let address = Address::named("john@example.com", "");
        assert!(address.name().is_none());
        assert_eq!(address, Address::new("john@example.com"));
    }

    #[test]
    fn test_malformed_address_passes_through() {
        let address = Address::new("not an address");
        assert_eq!(address.address(), "not an address");
    }

    #[test]
    fn test_serialize_skips_missing_name() {
        let json = serde_json::to_value(Address::new("a@x.com")).unwrap();
        assert_eq!(json, serde_json::json!({ "address": "a@x.com" }));

        let json = serde_json::to_value(Address::named("a@x.com", "A")).unwrap();
        assert_eq!(json, serde_json::json!({ "address": "a@x.com", "name": "A" }));
    }

    #[test]
    fn test_into_mailbox() {
        let mailbox = mailpost_mime::Mailbox::from(&Address::named("a@x.com", "A"));
        assert_eq!(mailbox.name.as_deref(), Some("A"));
        assert_eq!(mailbox.address, "a@x.com");
    }
}
