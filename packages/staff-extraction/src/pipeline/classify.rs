//! Content classifier: embedded markup data vs. visible text.
//!
//! Counts distinct email-like strings in the raw HTML and in the rendered
//! text. When the markup carries more addresses than a reader can see, the
//! data is hidden in attributes (`mailto:` hrefs, `aria-label`s, inline JSON)
//! and pattern extraction is the right tool. Otherwise the rendered text is
//! handed to the model.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::types::config::TiePolicy;

static RE_EMAIL_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

/// Which extraction strategy a page calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Contact data lives in markup, not in the rendered text
    Embedded,
    /// Contact data (if any) is visible in the rendered text
    Visible,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Visible => f.write_str("visible"),
        }
    }
}

/// Email counts behind a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentAnalysis {
    pub mode: ExtractionMode,
    /// Distinct addresses in the raw HTML
    pub html_emails: usize,
    /// Distinct addresses in the rendered text
    pub text_emails: usize,
}

/// Classify with the default tie policy (prefer visible).
pub fn classify(raw_html: &str, rendered_text: &str) -> ExtractionMode {
    analyze(raw_html, rendered_text, TiePolicy::default()).mode
}

/// Classify and report the counts used.
pub fn analyze(raw_html: &str, rendered_text: &str, tie: TiePolicy) -> ContentAnalysis {
    let html_emails = count_distinct_emails(raw_html);
    let text_emails = count_distinct_emails(rendered_text);

    let mode = if html_emails > text_emails {
        ExtractionMode::Embedded
    } else if html_emails == text_emails && html_emails > 0 && tie == TiePolicy::PreferEmbedded {
        ExtractionMode::Embedded
    } else {
        ExtractionMode::Visible
    };

    ContentAnalysis {
        mode,
        html_emails,
        text_emails,
    }
}

/// Count case-insensitively distinct email-like substrings.
pub fn count_distinct_emails(text: &str) -> usize {
    RE_EMAIL_LIKE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}
