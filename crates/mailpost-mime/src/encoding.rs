//! MIME encoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped at 76 columns with CRLF line breaks.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    // Base64 output is pure ASCII, so byte chunks are char boundaries.
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.push_str(&String::from_utf8_lossy(chunk));
    }

    result
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (LF or CRLF) become hard CRLF breaks; long lines
/// get soft breaks so that no encoded line exceeds 76 columns.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::new();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        encode_quoted_printable_line(line.strip_suffix('\r').unwrap_or(line), &mut result);
    }

    result
}

fn encode_quoted_printable_line(line: &str, out: &mut String) {
    let bytes = line.as_bytes();
    let mut line_length = 0;

    for (i, byte) in bytes.iter().enumerate() {
        let is_last = i + 1 == bytes.len();

        let mut token = String::with_capacity(3);
        match byte {
            b'!'..=b'<' | b'>'..=b'~' => token.push(*byte as char),
            // Trailing whitespace would be stripped in transit
            b' ' | b'\t' if !is_last => token.push(*byte as char),
            _ => {
                let _ = write!(token, "={byte:02X}");
            }
        }

        // Leave room for the trailing '=' of a soft break
        if line_length + token.len() > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        out.push_str(&token);
        line_length += token.len();
    }
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.chars()
        .any(|c| !c.is_ascii() || c.is_ascii_control() || c == '=' || c == '?')
}

/// Maximum length of one encoded word (RFC 2047 section 2).
const MAX_ENCODED_WORD: usize = 75;

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Values that are plain printable
/// ASCII are returned unchanged. Long values are split on character
/// boundaries into several space-separated encoded words, each at most 75
/// characters long.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    // "=?" charset "?B?" text "?="
    let overhead = charset.len() + 7;
    let max_bytes = (MAX_ENCODED_WORD.saturating_sub(overhead) / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        let next = i + c.len_utf8();
        if next - start > max_bytes && end > start {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    words.push(&text[start..end]);

    words
        .iter()
        .map(|word| format!("=?{charset}?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join(" ")
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
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines_wrap() {
        let data = vec![0u8; 120];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 76);
        assert_eq!(lines[2].len(), 8);
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_non_ascii() {
        let encoded = encode_quoted_printable("Héllo");
        assert_eq!(encoded, "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_equals_sign() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_preserves_line_breaks() {
        let encoded = encode_quoted_printable("line one\nline two\r\nline three");
        assert_eq!(encoded, "line one\r\nline two\r\nline three");
    }

    #[test]
    fn test_quoted_printable_trailing_space() {
        assert_eq!(encode_quoted_printable("end "), "end=20");
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        let text = "x".repeat(100);
        let encoded = encode_quoted_printable(&text);
        assert!(encoded.contains("=\r\n"));
        assert_eq!(encoded.replace("=\r\n", ""), text);
    }

    #[test]
    fn test_rfc2047_passthrough() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");
    }

    #[test]
    fn test_rfc2047_encode() {
        let encoded = encode_rfc2047("Héllo", "utf-8");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let text = "Réunion trimestrielle: résultats, prévisions et questions ouvertes";
        let encoded = encode_rfc2047(text, "utf-8");
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);

        let mut decoded = Vec::new();
        for word in words {
            assert!(word.len() <= MAX_ENCODED_WORD);
            let payload = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(STANDARD.decode(payload).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), text);
    }

    proptest! {
        #[test]
        fn rfc2047_words_fit(text in "\\PC{0,200}") {
            let encoded = encode_rfc2047(&text, "utf-8");
            if needs_encoding(&text) {
                for word in encoded.split(' ') {
                    prop_assert!(word.len() <= MAX_ENCODED_WORD);
                }
            }
        }


        #[test]
        fn quoted_printable_lines_fit(text in "\\PC{0,300}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
        }
    }
}
