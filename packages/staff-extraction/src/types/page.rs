//! Rendered page types exchanged with the renderer boundary.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// One rendered page: raw markup plus the text a reader would see.
///
/// Owned by the pagination controller for the duration of a single page and
/// dropped once its records are extracted.
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    /// URL the content was rendered from
    pub url: String,

    /// Fully rendered HTML (after scripts ran)
    pub raw_html: String,

    /// Markdown-like text view of the rendered page
    pub rendered_text: String,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl PageFetchResult {
    /// Create a new page fetched now.
    pub fn new(
        url: impl Into<String>,
        raw_html: impl Into<String>,
        rendered_text: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            raw_html: raw_html.into(),
            rendered_text: rendered_text.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Check if this page has any visible text.
    pub fn has_content(&self) -> bool {
        !self.rendered_text.trim().is_empty() || !self.raw_html.trim().is_empty()
    }

    /// Hash of the rendered text, used to notice clicks that did not
    /// advance the content.
    pub fn fingerprint(&self) -> String {
        content_fingerprint(&self.rendered_text)
    }
}

/// Result of clicking a next-control and waiting.
#[derive(Debug, Clone)]
pub struct ClickOutcome {
    /// Page content after the click (or the unchanged content on timeout)
    pub page: PageFetchResult,

    /// Whether the watched content region changed within the timeout
    pub changed: bool,
}

/// SHA-256 hex digest of whitespace-normalized text.
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    for word in text.split_whitespace() {
        hasher.update(word.as_bytes());
        hasher.update(b" ");
    }
    format!("{:x}", hasher.finalize())
}
