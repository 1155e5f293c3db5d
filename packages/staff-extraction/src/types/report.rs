//! Extraction results and the diagnostic channel.

use serde::Serialize;
use std::fmt;

use super::record::StaffRecord;

/// What kind of contained failure a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Page did not render in time
    RenderTimeout,
    /// Network/DNS/HTTP failure or unsupported interaction
    Navigation,
    /// One inference chunk failed and was treated as empty
    Inference,
    /// A next-control click did not advance the content
    PaginationLoop,
    /// The traversal was aborted (timeout or cancellation)
    Aborted,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RenderTimeout => "render_timeout",
            Self::Navigation => "navigation",
            Self::Inference => "inference",
            Self::PaginationLoop => "pagination_loop",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// A failure that was contained instead of aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// URL being processed when the failure happened
    pub url: String,

    /// 1-based page index, if the failure is tied to a page
    pub page: Option<usize>,

    pub kind: DiagnosticKind,

    pub message: String,
}

impl Diagnostic {
    pub fn new(url: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page: None,
            kind,
            message: message.into(),
        }
    }

    /// Attach the page index.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "[{}] {} (page {}): {}", self.kind, self.url, page, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.url, self.message),
        }
    }
}

/// Records extracted from one URL, with how many pages were visited.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Starting URL
    pub url: String,

    /// Deduplicated records in first-seen order
    pub records: Vec<StaffRecord>,

    /// Number of pages actually fetched
    pub pages_visited: usize,

    /// Contained failures, in the order they happened
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionReport {
    /// An empty report for a URL.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// A report for a URL that failed entirely.
    pub fn failed(url: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
            ..Self::empty(url)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Concatenated results of a multi-URL run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// One report per input URL, in input order
    pub reports: Vec<ExtractionReport>,
}

impl BatchReport {
    /// All records across URLs, concatenated without cross-URL dedup.
    pub fn records(&self) -> Vec<StaffRecord> {
        self.reports
            .iter()
            .flat_map(|r| r.records.iter().cloned())
            .collect()
    }

    /// All diagnostics across URLs.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reports.iter().flat_map(|r| r.diagnostics.iter())
    }

    /// Total pages visited across URLs.
    pub fn pages_visited(&self) -> usize {
        self.reports.iter().map(|r| r.pages_visited).sum()
    }
}
