//! Turning message content into a final HTML body.

use std::collections::HashMap;

use crate::error::RenderError;
use crate::message::MailMessage;

/// Produces the final HTML body of a message.
pub trait Renderer: Send + Sync {
    /// Renders `message` for the given locale.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be produced.
    fn render(&self, message: &MailMessage, locale: Option<&str>) -> Result<String, RenderError>;
}

/// Renderer backed by pre-rendered views.
///
/// Picks the first body representation present, in this order:
/// `html_string`, `html`, `view`, `markdown`, `text`. Views are looked up by
/// name, first as `{name}.{locale}` and then as `{name}`. No template syntax
/// is interpreted.
#[derive(Debug, Clone, Default)]
pub struct BasicRenderer {
    views: HashMap<String, String>,
}

impl BasicRenderer {
    /// Creates a renderer without views.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the HTML for a view.
    #[must_use]
    pub fn with_view(mut self, name: impl Into<String>, html: impl Into<String>) -> Self {
        self.register_view(name, html);
        self
    }

    /// Registers the HTML for a view, replacing any earlier registration.
    pub fn register_view(&mut self, name: impl Into<String>, html: impl Into<String>) {
        self.views.insert(name.into(), html.into());
    }

    fn view(&self, name: &str, locale: Option<&str>) -> Result<String, RenderError> {
        let localized = locale.and_then(|locale| self.views.get(&format!("{name}.{locale}")));
        localized
            .or_else(|| self.views.get(name))
            .cloned()
            .ok_or_else(|| RenderError::ViewNotFound(name.to_string()))
    }
}

impl Renderer for BasicRenderer {
    fn render(&self, message: &MailMessage, locale: Option<&str>) -> Result<String, RenderError> {
        let content = &message.content;

        if let Some(html) = content.html_string.as_ref().or(content.html.as_ref()) {
            return Ok(html.clone());
        }
        if let Some(view) = &content.view {
            return self.view(view, locale);
        }
        if let Some(markdown) = &content.markdown {
            return Ok(paragraphs(markdown));
        }
        if let Some(text) = &content.text {
            return Ok(paragraphs(text));
        }

        Err(RenderError::EmptyBody)
    }
}

/// Wraps blank-line separated blocks of escaped text in `<p>` elements.
fn paragraphs(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", escape_html(block).replace('\n', "<br>\n")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
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
    use crate::content::Content;

    fn message(content: Content) -> MailMessage {
        MailMessage {
            content,
            ..MailMessage::default()
        }
    }

    #[test]
    fn test_html_string_wins() {
        let content = Content {
            view: Some("welcome".to_string()),
            html: Some("<p>html</p>".to_string()),
            html_string: Some("<p>string</p>".to_string()),
            ..Content::default()
        };
        let html = BasicRenderer::new().render(&message(content), None).unwrap();
        assert_eq!(html, "<p>string</p>");
    }

    #[test]
    fn test_view_lookup_with_locale() {
        let renderer = BasicRenderer::new()
            .with_view("welcome", "<h1>Welcome</h1>")
            .with_view("welcome.fr", "<h1>Bienvenue</h1>");
        let content = Content {
            view: Some("welcome".to_string()),
            text: Some("ignored".to_string()),
            ..Content::default()
        };

        let message = message(content);
        assert_eq!(renderer.render(&message, None).unwrap(), "<h1>Welcome</h1>");
        assert_eq!(
            renderer.render(&message, Some("fr")).unwrap(),
            "<h1>Bienvenue</h1>"
        );
        assert_eq!(
            renderer.render(&message, Some("de")).unwrap(),
            "<h1>Welcome</h1>"
        );
    }

    #[test]
    fn test_unknown_view() {
        let content = Content {
            view: Some("missing".to_string()),
            ..Content::default()
        };
        let result = BasicRenderer::new().render(&message(content), None);
        assert!(matches!(result, Err(RenderError::ViewNotFound(name)) if name == "missing"));
    }

    #[test]
    fn test_text_fallback_is_escaped() {
        let content = Content {
            text: Some("Hello <you>\nline two\n\nSecond & last".to_string()),
            ..Content::default()
        };
        let html = BasicRenderer::new().render(&message(content), None).unwrap();
        assert_eq!(
            html,
            "<p>Hello &lt;you&gt;<br>\nline two</p>\n<p>Second &amp; last</p>"
        );
    }

    #[test]
    fn test_markdown_before_text() {
        let content = Content {
            markdown: Some("from markdown".to_string()),
            text: Some("from text".to_string()),
            ..Content::default()
        };
        let html = BasicRenderer::new().render(&message(content), None).unwrap();
        assert_eq!(html, "<p>from markdown</p>");
    }

    #[test]
    fn test_empty_body() {
        let result = BasicRenderer::new().render(&MailMessage::default(), None);
        assert!(matches!(result, Err(RenderError::EmptyBody)));
    }
}
