//! HTML helpers shared by renderers.

use scraper::{Html, Selector};

use crate::types::page::content_fingerprint;

/// Tags whose content never reaches the rendered text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Convert HTML to a Markdown-like text view.
///
/// Falls back to plain text when the converter fails.
pub fn html_to_text(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    converter.convert(html).unwrap_or_else(|_| {
        let document = Html::parse_document(html);
        document.root_element().text().collect::<Vec<_>>().join(" ")
    })
}

/// Visible text of every element matching `selector`.
///
/// An unparseable selector or no match yields `None`.
pub fn region_text(html: &str, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);

    let parts: Vec<String> = document
        .select(&selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n"))
}

/// Fingerprint of the watched region, or of the whole document when the
/// region is missing.
pub fn region_fingerprint(html: &str, selector: &str) -> String {
    match region_text(html, selector) {
        Some(text) => content_fingerprint(&text),
        None => content_fingerprint(html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_drops_scripts() {
        let text = html_to_text(
            "<html><body><h1>Staff</h1><script>var x = 1;</script><p>Ann Lee</p></body></html>",
        );
        assert!(text.contains("Staff"));
        assert!(text.contains("Ann Lee"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn test_region_text() {
        let html = r#"<div id="dir"><p>Ann</p><p>Bob</p></div><footer>x</footer>"#;
        let text = region_text(html, "#dir").unwrap();
        assert!(text.contains("Ann") && text.contains("Bob"));
        assert!(!text.contains('x'));
        assert!(region_text(html, "#missing").is_none());
        assert!(region_text(html, "a[[").is_none());
    }

    #[test]
    fn test_region_fingerprint_ignores_outside_changes() {
        let before = r#"<div id="dir">Ann</div><span>1</span>"#;
        let after = r#"<div id="dir">Ann</div><span>2</span>"#;
        assert_eq!(
            region_fingerprint(before, "#dir"),
            region_fingerprint(after, "#dir")
        );
        assert_ne!(region_fingerprint(before, "body"), region_fingerprint(after, "body"));
    }
}
