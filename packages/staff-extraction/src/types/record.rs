//! Staff records and their identity keys.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$")
        .unwrap()
});
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RE_HONORIFIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Mr|Mrs|Ms|Dr|Prof)\.\s*").unwrap());

/// Minimum name length once an honorific is stripped.
const MIN_NAME_CHARS: usize = 2;

/// A single person found in a staff directory.
///
/// Records are built through [`StaffRecord::new`], which normalizes every
/// field. A record always has a non-empty name; an email that is present has
/// passed a syntactic plausibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StaffRecord {
    /// The exact full name as shown on the page
    pub name: String,

    /// Job title (Teacher, Principal, Secretary, ...)
    #[serde(default)]
    pub role: Option<String>,

    /// Contact email, from a mailto link or visible text
    #[serde(default)]
    pub email: Option<String>,
}

impl StaffRecord {
    /// Build a normalized record.
    ///
    /// Returns `None` when the name is unusable. An implausible email is
    /// dropped rather than rejecting the whole record.
    pub fn new(
        name: impl AsRef<str>,
        role: Option<impl AsRef<str>>,
        email: Option<impl AsRef<str>>,
    ) -> Option<Self> {
        let name = normalize_text(name.as_ref());
        if !is_plausible_name(&name) {
            return None;
        }

        let role = role
            .map(|r| normalize_text(r.as_ref()))
            .filter(|r| !r.is_empty());
        let email = email.and_then(|e| normalize_email(e.as_ref()));

        Some(Self { name, role, email })
    }

    /// Re-run normalization on a record that came from outside (e.g. a model
    /// response deserialized directly).
    pub fn normalized(self) -> Option<Self> {
        Self::new(self.name, self.role, self.email)
    }

    /// Key used to deduplicate records across pages.
    pub fn identity_key(&self) -> IdentityKey {
        match &self.email {
            Some(email) => IdentityKey::Email(email.to_lowercase()),
            None => IdentityKey::NameRole(
                self.name.to_lowercase(),
                self.role.as_deref().unwrap_or_default().to_lowercase(),
            ),
        }
    }

    /// Fill absent fields from another record describing the same person.
    ///
    /// Present values are never overwritten. Returns true if anything changed.
    pub fn fill_from(&mut self, other: &StaffRecord) -> bool {
        let mut changed = false;
        if self.role.is_none() && other.role.is_some() {
            self.role = other.role.clone();
            changed = true;
        }
        if self.email.is_none() && other.email.is_some() {
            self.email = other.email.clone();
            changed = true;
        }
        changed
    }
}

impl fmt::Display for StaffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.name,
            self.role.as_deref().unwrap_or("N/A"),
            self.email.as_deref().unwrap_or("N/A")
        )
    }
}

/// Deduplication key: lowercased email, or lowercased name+role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Email(String),
    NameRole(String, String),
}

/// Decode common entities, collapse whitespace and trim.
pub fn normalize_text(raw: &str) -> String {
    let decoded = raw
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    RE_WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Lowercase and validate an email. Returns `None` if implausible.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw
        .trim()
        .trim_start_matches("mailto:")
        .split('?')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    is_plausible_email(&email).then_some(email)
}

/// Syntactic plausibility check for an already-lowercased address.
pub fn is_plausible_email(email: &str) -> bool {
    RE_EMAIL.is_match(email)
}

fn is_plausible_name(name: &str) -> bool {
    let stripped = RE_HONORIFIC.replace(name, "");
    stripped.trim().chars().count() >= MIN_NAME_CHARS
}
