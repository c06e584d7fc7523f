//! Body portion of a message.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::envelope::non_empty;

/// Assembled content descriptor handed to the renderer.
///
/// Several body representations may be present at once; which one wins is
/// the renderer's decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Content {
    /// Name of a view (template) to render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    /// Raw HTML body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Plain text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Markdown source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Pre-rendered HTML string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_string: Option<String>,
    /// Template variables.
    #[serde(rename = "with", skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, Value>,
}

impl Content {
    /// Returns true if no body representation is present.
    #[must_use]
    pub const fn has_no_body(&self) -> bool {
        self.view.is_none()
            && self.html.is_none()
            && self.text.is_none()
            && self.markdown.is_none()
            && self.html_string.is_none()
    }
}

/// Content fields as configured on a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub(crate) view: Option<String>,
    pub(crate) html: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) markdown: Option<String>,
    pub(crate) html_string: Option<String>,
    pub(crate) with: BTreeMap<String, Value>,
}

impl ContentFields {
    /// Builds a [`Content`] from the current fields.
    ///
    /// Each representation is carried over independently when non-empty.
    #[must_use]
    pub fn assemble(&self) -> Content {
        let carry = |value: &Option<String>| non_empty(value.as_deref()).map(str::to_string);

        Content {
            view: carry(&self.view),
            html: carry(&self.html),
            text: carry(&self.text),
            markdown: carry(&self.markdown),
            html_string: carry(&self.html_string),
            with: self.with.clone(),
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
    use serde_json::json;

    #[test]
    fn test_empty_fields() {
        let content = ContentFields::default().assemble();
        assert!(content.has_no_body());
        assert_eq!(serde_json::to_value(&content).unwrap(), json!({}));
    }

    #[test]
    fn test_all_representations_kept() {
        let fields = ContentFields {
            view: Some("welcome".to_string()),
            html: Some("<p>hi</p>".to_string()),
            text: Some("hi".to_string()),
            markdown: Some("# hi".to_string()),
            html_string: Some("<b>hi</b>".to_string()),
            with: BTreeMap::new(),
        };

        let content = fields.assemble();
        assert_eq!(content.view.as_deref(), Some("welcome"));
        assert_eq!(content.html.as_deref(), Some("<p>hi</p>"));
        assert_eq!(content.text.as_deref(), Some("hi"));
        assert_eq!(content.markdown.as_deref(), Some("# hi"));
        assert_eq!(content.html_string.as_deref(), Some("<b>hi</b>"));
    }

    #[test]
    fn test_empty_strings_dropped() {
        let fields = ContentFields {
            view: Some(String::new()),
            text: Some("body".to_string()),
            ..ContentFields::default()
        };

        let content = fields.assemble();
        assert!(content.view.is_none());
        assert_eq!(content.text.as_deref(), Some("body"));
    }

    #[test]
    fn test_template_variables_serialized_as_with() {
        let mut with = BTreeMap::new();
        with.insert("name".to_string(), json!("Ada"));
        with.insert("count".to_string(), json!(3));
        let fields = ContentFields {
            view: Some("welcome".to_string()),
            with,
            ..ContentFields::default()
        };

        assert_eq!(
            serde_json::to_value(fields.assemble()).unwrap(),
            json!({ "view": "welcome", "with": { "count": 3, "name": "Ada" } })
        );
    }
}
