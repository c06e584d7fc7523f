//! Custom header portion of a message.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::envelope::non_empty;

/// Assembled custom headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers {
    /// Message-ID, without angle brackets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Referenced message ids, in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Free-form text headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub text: BTreeMap<String, String>,
}

impl Headers {
    /// Returns true if no header is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message_id.is_none() && self.references.is_empty() && self.text.is_empty()
    }
}

/// Header fields as configured on a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    pub(crate) message_id: Option<String>,
    pub(crate) references: Vec<String>,
    pub(crate) text: BTreeMap<String, String>,
}

impl HeaderFields {
    /// Builds a [`Headers`] from the current fields.
    #[must_use]
    pub fn assemble(&self) -> Headers {
        Headers {
            message_id: non_empty(self.message_id.as_deref()).map(str::to_string),
            references: self.references.clone(),
            text: self.text.clone(),
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
    fn test_empty() {
        let headers = HeaderFields::default().assemble();
        assert!(headers.is_empty());
        assert_eq!(serde_json::to_value(&headers).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_empty_message_id_omitted() {
        let fields = HeaderFields {
            message_id: Some(String::new()),
            ..HeaderFields::default()
        };
        assert!(fields.assemble().message_id.is_none());
    }

    #[test]
    fn test_references_keep_order_and_duplicates() {
        let fields = HeaderFields {
            references: vec!["b@x".to_string(), "a@x".to_string(), "b@x".to_string()],
            ..HeaderFields::default()
        };
        assert_eq!(fields.assemble().references, vec!["b@x", "a@x", "b@x"]);
    }

    #[test]
    fn test_text_headers() {
        let mut text = BTreeMap::new();
        text.insert("X-Campaign".to_string(), "spring".to_string());
        let fields = HeaderFields {
            message_id: Some("abc@example.com".to_string()),
            text,
            ..HeaderFields::default()
        };

        assert_eq!(
            serde_json::to_value(fields.assemble()).unwrap(),
            serde_json::json!({
                "message_id": "abc@example.com",
                "text": { "X-Campaign": "spring" }
            })
        );
    }
}
