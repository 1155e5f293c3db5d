//! Pattern extractor for contact data embedded in markup.
//!
//! Recognizers live in [`RECOGNIZERS`], an ordered table of
//! `(pattern, capture mapping)` entries. They run in priority order and the
//! first recognizer to produce a record for an email owns it; later
//! recognizers skip that address. Nothing here fails: input that matches no
//! recognizer yields an empty vec.

use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

use crate::types::record::{normalize_email, StaffRecord};

/// Max distance between an email key and its sibling keys.
const PROXIMITY_WINDOW: usize = 200;

/// Mailboxes that belong to an office rather than a person.
const GENERIC_MAILBOXES: &[&str] = &[
    "info@", "contact@", "office@", "admin@", "school@", "support@",
];

/// Anchor labels that are calls to action, not names.
const LINK_TEXT_STOPWORDS: &[&str] = &[
    "email", "e-mail", "mail", "send email", "send an email", "email me", "contact",
    "contact me", "send message",
];

static RE_ARIA_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)aria-label\s*=\s*["']\s*send\s+(?:a\s+)?message\s+to\s+(?P<name>[^"<>]+?)\s+at\s+(?P<email>[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})\s*["']"#,
    )
    .unwrap()
});

static RE_MAILTO_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<a\b[^>]*?\bhref\s*=\s*["']\s*mailto:(?P<email>[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})[^"']*["'][^>]*>(?:\s*<(?:span|strong|b|em|i)\b[^>]*>)*\s*(?P<name>[^<]+?)\s*(?:</(?:span|strong|b|em|i)>\s*)*</a>"#,
    )
    .unwrap()
});

static RE_EMBEDDED_EMAIL_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"["'][A-Za-z_]*(?i:mail)[A-Za-z_]*["']\s*:\s*["']\s*(?:mailto:)?(?P<email>[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\s*["']"#,
    )
    .unwrap()
});

static RE_QUOTED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](?P<key>[A-Za-z_]+)["']\s*:\s*(?:"(?P<dq>(?:[^"\\]|\\.)*)"|'(?P<sq>(?:[^'\\]|\\.)*)')"#)
        .unwrap()
});

/// How a recognizer's match becomes a record.
#[derive(Debug, Clone, Copy)]
pub enum CaptureMapping {
    /// `name` and `email` named groups; no role.
    Groups { skip_generic: bool },

    /// `email` group locates a key/value fragment; name and role come from
    /// sibling keys within [`PROXIMITY_WINDOW`]. Keys are tried in order and
    /// a key used for the name is not reused for the role.
    SiblingKeys {
        name_keys: &'static [&'static str],
        role_keys: &'static [&'static str],
    },
}

/// One structural recognizer.
pub struct Recognizer {
    pub name: &'static str,
    pub pattern: &'static LazyLock<Regex>,
    pub mapping: CaptureMapping,
}

/// Recognizers in priority order.
pub static RECOGNIZERS: &[Recognizer] = &[
    Recognizer {
        name: "aria_label",
        pattern: &RE_ARIA_LABEL,
        mapping: CaptureMapping::Groups {
            skip_generic: false,
        },
    },
    Recognizer {
        name: "mailto_text",
        pattern: &RE_MAILTO_TEXT,
        mapping: CaptureMapping::Groups { skip_generic: true },
    },
    Recognizer {
        name: "embedded_data",
        pattern: &RE_EMBEDDED_EMAIL_KEY,
        mapping: CaptureMapping::SiblingKeys {
            name_keys: &["name", "displayName", "fullName", "full_name", "title"],
            role_keys: &["jobTitle", "job_title", "position", "role", "title"],
        },
    },
];

/// Extract records from raw HTML using [`RECOGNIZERS`].
pub fn extract_embedded(raw_html: &str) -> Vec<StaffRecord> {
    // Inline JSON inside attributes arrives entity-escaped
    let html = raw_html.replace("&quot;", "\"").replace("&#34;", "\"");

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for recognizer in RECOGNIZERS {
        let before = records.len();

        for caps in recognizer.pattern.captures_iter(&html) {
            let Some(email) = caps.name("email").and_then(|m| normalize_email(m.as_str())) else {
                continue;
            };
            if seen.contains(&email) {
                continue;
            }

            let record = match recognizer.mapping {
                CaptureMapping::Groups { skip_generic } => {
                    if skip_generic && is_generic_mailbox(&email) {
                        continue;
                    }
                    caps.name("name")
                        .map(|m| m.as_str())
                        .filter(|name| is_name_like(name))
                        .and_then(|name| StaffRecord::new(name, None::<&str>, Some(&email)))
                }
                CaptureMapping::SiblingKeys {
                    name_keys,
                    role_keys,
                } => from_sibling_keys(&html, &caps, &email, name_keys, role_keys),
            };

            if let Some(record) = record {
                seen.insert(email);
                records.push(record);
            }
        }

        debug!(
            recognizer = recognizer.name,
            found = records.len() - before,
            "Recognizer pass complete"
        );
    }

    records
}

fn is_generic_mailbox(email: &str) -> bool {
    GENERIC_MAILBOXES.iter().any(|p| email.starts_with(p))
}

fn is_name_like(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    !lowered.contains('@') && !LINK_TEXT_STOPWORDS.contains(&lowered.as_str())
}

fn from_sibling_keys(
    html: &str,
    caps: &Captures<'_>,
    email: &str,
    name_keys: &[&str],
    role_keys: &[&str],
) -> Option<StaffRecord> {
    let whole = caps.get(0)?;
    let fragment = object_fragment(html, whole.start(), whole.end());

    let mut fields: HashMap<String, String> = HashMap::new();
    for pair in RE_QUOTED_PAIR.captures_iter(fragment) {
        let key = pair["key"].to_lowercase();
        let value = pair
            .name("dq")
            .or_else(|| pair.name("sq"))
            .map(|m| m.as_str().replace("\\\"", "\"").replace("\\'", "'"))
            .unwrap_or_default();
        fields.entry(key).or_insert(value);
    }

    let (name_key, name) = name_keys.iter().find_map(|k| {
        let key = k.to_lowercase();
        fields
            .get(&key)
            .filter(|v| is_name_like(v))
            .map(|v| (key, v.clone()))
    })?;

    let role = role_keys
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| *k != name_key)
        .find_map(|k| fields.get(&k).cloned());

    StaffRecord::new(name, role, Some(email))
}

/// Slice around a match, bounded by the window and by the nearest object
/// braces so sibling keys never leak in from a neighbouring record.
fn object_fragment(html: &str, start: usize, end: usize) -> &str {
    let mut left = floor_char_boundary(html, start.saturating_sub(PROXIMITY_WINDOW));
    if let Some(pos) = html[left..start].rfind(['{', '}']) {
        left += pos + 1;
    }

    let mut right = floor_char_boundary(html, (end + PROXIMITY_WINDOW).min(html.len()));
    if let Some(pos) = html[end..right].find(['{', '}']) {
        right = end + pos;
    }

    &html[left..right]
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
