//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Guesses the content type from a file name's extension.
    ///
    /// Unknown or missing extensions yield `application/octet-stream`.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let guess = mime_guess::from_path(filename).first_or_octet_stream();
        guess
            .essence_str()
            .split_once('/')
            .map_or_else(Self::octet_stream, |(main, sub)| Self::new(main, sub))
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {s:?}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!(
                "Empty type or subtype in {s:?}"
            )));
        }

        let mut content_type = Self::new(main_type, sub_type);

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                content_type.parameters.insert(key, value);
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            write!(f, "; {key}={}", parameter_value(value))?;
        }

        Ok(())
    }
}

/// Formats a parameter value, quoting it if it contains tspecials
/// (RFC 2045). Backslashes and quotes inside a quoted value are escaped.
#[must_use]
pub(crate) fn parameter_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c));
    if needs_quotes {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
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
    fn test_text_plain() {
        let ct = ContentType::text_plain();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(ct.is_text());
    }

    #[test]
    fn test_multipart_alternative() {
        let ct = ContentType::multipart_alternative("b1");
        assert_eq!(ct.essence(), "multipart/alternative");
        assert_eq!(ct.boundary(), Some("b1"));
        assert!(ct.is_multipart());
    }

    #[test]
    fn test_from_filename() {
        assert_eq!(ContentType::from_filename("doc.pdf").essence(), "application/pdf");
        assert_eq!(ContentType::from_filename("Photo.JPG").essence(), "image/jpeg");
        assert_eq!(
            ContentType::from_filename("archive.unknown").essence(),
            "application/octet-stream"
        );
        assert_eq!(
            ContentType::from_filename("README").essence(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_from_filename_common_types() {
        assert_eq!(ContentType::from_filename("clip.mov").essence(), "video/quicktime");
        assert_eq!(ContentType::from_filename("scan.tiff").essence(), "image/tiff");
        assert_eq!(ContentType::from_filename("logo.svg").essence(), "image/svg+xml");
        assert_eq!(ContentType::from_filename("data.csv").essence(), "text/csv");
    }

    #[test]
    fn test_parameter_value_escapes_quotes() {
        assert_eq!(parameter_value("plain.txt"), "plain.txt");
        assert_eq!(parameter_value("say \"hi\".txt"), "\"say \\\"hi\\\".txt\"");
        assert_eq!(parameter_value("a\\b c"), "\"a\\\\b c\"");

        let ct = ContentType::new("text", "plain").with_parameter("name", "say \"hi\".txt");
        assert_eq!(ct.to_string(), "text/plain; name=\"say \\\"hi\\\".txt\"");
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_rejects_missing_subtype() {
        assert!(ContentType::parse("application").is_err());
        assert!(ContentType::parse("text/").is_err());
    }

    #[test]
    fn test_content_type_display_quotes_tspecials() {
        let ct = ContentType::multipart_mixed("=_abc");
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"=_abc\"");

        let ct = ContentType::text_html();
        assert_eq!(ct.to_string(), "text/html; charset=utf-8");
    }
}
