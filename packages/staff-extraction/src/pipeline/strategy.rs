//! Per-page strategy dispatch.
//!
//! The classifier's [`ExtractionMode`] selects an [`ExtractionStrategy`];
//! [`extract_page`] runs it. Pattern extraction never calls the model.
//! Model extraction runs only for visible pages, or for embedded pages that
//! produced nothing when `fallback_to_model` is set.

use std::fmt;
use tracing::debug;

use super::classify::{analyze, ContentAnalysis, ExtractionMode};
use super::patterns::extract_embedded;
use super::visible::extract_visible;
use crate::traits::model::ModelBackend;
use crate::types::config::CrawlerConfig;
use crate::types::page::PageFetchResult;
use crate::types::record::StaffRecord;
use crate::types::report::Diagnostic;
use crate::types::schema::RecordSchema;

/// How records are pulled out of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Structural recognizers over raw HTML
    Pattern,
    /// Model backend over rendered text
    Model,
}

impl ExtractionStrategy {
    pub fn for_mode(mode: ExtractionMode) -> Self {
        match mode {
            ExtractionMode::Embedded => Self::Pattern,
            ExtractionMode::Visible => Self::Model,
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => f.write_str("pattern"),
            Self::Model => f.write_str("model"),
        }
    }
}

/// Records and diagnostics from one page.
#[derive(Debug)]
pub struct PageExtraction {
    pub analysis: ContentAnalysis,

    /// Strategy whose records are returned
    pub strategy: ExtractionStrategy,

    pub records: Vec<StaffRecord>,

    /// Contained inference failures, tagged with the page index
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify one page and run the matching strategy.
pub async fn extract_page<M>(
    page: &PageFetchResult,
    page_index: usize,
    backend: &M,
    schema: &RecordSchema,
    config: &CrawlerConfig,
) -> PageExtraction
where
    M: ModelBackend + ?Sized,
{
    let analysis = analyze(&page.raw_html, &page.rendered_text, config.tie_policy);
    let mut strategy = ExtractionStrategy::for_mode(analysis.mode);

    let mut records = Vec::new();
    if strategy == ExtractionStrategy::Pattern {
        records = extract_embedded(&page.raw_html);
        if records.is_empty() && config.fallback_to_model {
            debug!(url = %page.url, page = page_index, "No pattern matches, falling back to model");
            strategy = ExtractionStrategy::Model;
        }
    }

    let mut diagnostics = Vec::new();
    if strategy == ExtractionStrategy::Model {
        let visible = extract_visible(
            backend,
            &page.url,
            &page.rendered_text,
            schema,
            &config.chunking,
        )
        .await;
        records = visible.records;
        diagnostics = visible
            .diagnostics
            .into_iter()
            .map(|d| d.on_page(page_index))
            .collect();
    }

    debug!(
        url = %page.url,
        page = page_index,
        mode = %analysis.mode,
        html_emails = analysis.html_emails,
        text_emails = analysis.text_emails,
        strategy = %strategy,
        found = records.len(),
        "Page extracted"
    );

    PageExtraction {
        analysis,
        strategy,
        records,
        diagnostics,
    }
}
