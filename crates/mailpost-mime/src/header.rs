//! MIME header handling.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Headers are written in insertion order with names exactly as given.
/// Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name or the value
    /// contains a line break.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;
        self.headers.push((name, value));
        Ok(())
    }

    /// Adds a header with an unstructured value, RFC 2047 encoding it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name.
    pub fn add_text(&mut self, name: impl Into<String>, value: &str) -> Result<()> {
        let single_line = value.replace(['\r', '\n'], " ");
        self.add(name, encode_rfc2047(&single_line, "utf-8"))
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Headers::add`].
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.remove(&name);
        self.add(name, value)
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns true if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("Invalid header name: {name:?}")));
    }
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader(format!(
            "Line break in value of {name}"
        )));
    }
    Ok(())
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
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
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("content-type", "text/plain").unwrap();
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_headers_keep_name_casing() {
        let mut headers = Headers::new();
        headers.add("X-MyHeader", "v").unwrap();
        headers.add("x-lower", "w").unwrap();
        assert_eq!(headers.to_string(), "X-MyHeader: v\r\nx-lower: w\r\n");
        assert_eq!(headers.get("x-myheader"), Some("v"));
    }

    #[test]
    fn test_headers_set_replaces() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com").unwrap();
        headers.add("To", "bob@example.com").unwrap();
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com").unwrap();
        assert_eq!(headers.get_all("to"), vec!["charlie@example.com"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test").unwrap();
        headers.remove("subject");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_reject_injection() {
        let mut headers = Headers::new();
        assert!(headers.add("X-Tag", "a\r\nBcc: evil@example.com").is_err());
        assert!(headers.add("Bad Name", "value").is_err());
        assert!(headers.add("", "value").is_err());
    }

    #[test]
    fn test_headers_add_text_encodes() {
        let mut headers = Headers::new();
        headers.add_text("Subject", "Héllo").unwrap();
        assert_eq!(headers.get("Subject"), Some("=?utf-8?B?SMOpbGxv?="));
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com").unwrap();
        headers.add("From", "sender@example.com").unwrap();
        headers.add("Message-ID", "<1@example.com>").unwrap();

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\r\nFrom: sender@example.com\r\nMessage-ID: <1@example.com>\r\n"
        );
    }
}
