//! Pagination controller.
//!
//! One traversal walks `DETECTING -> {URL_PARAM_LOOP | CLICK_LOOP |
//! SINGLE_PAGE} -> DONE` over a single render session:
//!
//! - **Detecting**: fetch page 1, extract it, then look for a page-number
//!   query parameter (in the URL or in pagination links) and, failing that,
//!   for a next control. URL detection wins over click detection.
//! - **URL loop**: rewrite the parameter to the next number and fetch.
//! - **Click loop**: click the control found on page 1 and wait for the
//!   content region to change.
//! - **Single page**: page 1 only.
//!
//! Every loop stops at `max_pages`, after two consecutive pages that add no
//! new records, or at the first page-level failure. Failures become
//! diagnostics; records merged so far are kept.

use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::aggregate::Aggregator;
use super::controls::{detect_next_control, locate_control, DetectedControl, NextControl};
use super::strategy::extract_page;
use super::url_param::{detect_url_pagination, UrlPagination};
use crate::error::{ExtractionError, RenderError};
use crate::traits::model::ModelBackend;
use crate::traits::renderer::RenderSession;
use crate::types::config::CrawlerConfig;
use crate::types::page::PageFetchResult;
use crate::types::report::{Diagnostic, DiagnosticKind, ExtractionReport};
use crate::types::schema::RecordSchema;

/// Consecutive zero-new pages that end a loop.
const EMPTY_PAGE_LIMIT: usize = 2;

/// How a traversal moves to the next page. Detected once, from page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationStyle {
    UrlParam { param: String },
    ClickControl { selector: String },
    None,
}

impl fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UrlParam { param } => write!(f, "url_param({})", param),
            Self::ClickControl { selector } => write!(f, "click({})", selector),
            Self::None => f.write_str("none"),
        }
    }
}

/// Per-traversal bookkeeping. Never shared between traversals.
#[derive(Debug, Clone)]
pub struct PaginationState {
    /// 1-based index of the page being processed
    pub current_page_index: usize,
    pub style: PaginationStyle,
    pub pages_fetched: usize,
    pub consecutive_empty: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page_index: 0,
            style: PaginationStyle::None,
            pages_fetched: 0,
            consecutive_empty: 0,
        }
    }
}

impl PaginationState {
    /// Count a fetched page and make it current.
    fn page_fetched(&mut self) {
        self.pages_fetched += 1;
        self.current_page_index += 1;
    }

    /// Update the empty-page streak. Returns true when the loop should stop.
    fn record_new(&mut self, added: usize) -> bool {
        if added == 0 {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
        self.consecutive_empty >= EMPTY_PAGE_LIMIT
    }
}

/// Drives one URL's traversal.
pub struct PaginationController<'a, M: ModelBackend + ?Sized> {
    backend: &'a M,
    schema: &'a RecordSchema,
    config: &'a CrawlerConfig,
    controls: &'a [NextControl],
}

/// Outcome of the detecting state.
enum Detected {
    UrlParam(UrlPagination),
    Click(DetectedControl),
    SinglePage,
}

impl Detected {
    fn style(&self) -> PaginationStyle {
        match self {
            Self::UrlParam(p) => PaginationStyle::UrlParam {
                param: p.param.clone(),
            },
            Self::Click(found) => PaginationStyle::ClickControl {
                selector: found.click_selector.clone(),
            },
            Self::SinglePage => PaginationStyle::None,
        }
    }
}

/// Mutable parts of one traversal.
struct Traversal {
    url: String,
    state: PaginationState,
    aggregator: Aggregator,
    diagnostics: Vec<Diagnostic>,
}

impl Traversal {
    fn into_report(self) -> ExtractionReport {
        ExtractionReport {
            url: self.url,
            records: self.aggregator.into_records(),
            pages_visited: self.state.pages_fetched,
            diagnostics: self.diagnostics,
        }
    }

    fn fail(&mut self, page: usize, error: &RenderError) {
        warn!(url = %self.url, page = page, error = %error, "Page failed, stopping traversal");
        let kind = match error {
            RenderError::Timeout { .. } => DiagnosticKind::RenderTimeout,
            _ => DiagnosticKind::Navigation,
        };
        self.diagnostics
            .push(Diagnostic::new(&self.url, kind, error.to_string()).on_page(page));
    }
}

impl<'a, M: ModelBackend + ?Sized> PaginationController<'a, M> {
    pub fn new(
        backend: &'a M,
        schema: &'a RecordSchema,
        config: &'a CrawlerConfig,
        controls: &'a [NextControl],
    ) -> Self {
        Self {
            backend,
            schema,
            config,
            controls,
        }
    }

    /// Run a traversal. With `paginate` false only page 1 is processed.
    pub async fn traverse(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
        paginate: bool,
    ) -> ExtractionReport {
        let mut run = Traversal {
            url: url.to_string(),
            state: PaginationState::default(),
            aggregator: Aggregator::new(),
            diagnostics: Vec::new(),
        };

        // DETECTING
        let first = match session.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                run.fail(1, &e);
                return run.into_report();
            }
        };
        run.state.page_fetched();
        let added = self.process(&first, &mut run).await;
        run.state.record_new(added);

        let detected = if paginate {
            self.detect(url, &first)
        } else {
            Detected::SinglePage
        };
        run.state.style = detected.style();
        info!(url = %url, style = %run.state.style, "Pagination detected");

        match detected {
            Detected::UrlParam(pagination) => {
                drop(first);
                self.url_loop(session, pagination, &mut run).await;
            }
            Detected::Click(found) => {
                let control = &self.controls[found.index];
                self.click_loop(session, control, found.click_selector, first, &mut run)
                    .await;
            }
            Detected::SinglePage => {}
        }

        info!(
            url = %url,
            pages = run.state.pages_fetched,
            records = run.aggregator.len(),
            diagnostics = run.diagnostics.len(),
            "Traversal complete"
        );
        run.into_report()
    }

    fn detect(&self, url: &str, first: &PageFetchResult) -> Detected {
        if let Some(pagination) = detect_url_pagination(url, &first.raw_html) {
            return Detected::UrlParam(pagination);
        }
        match detect_next_control(&first.raw_html, self.controls) {
            Some(found) => {
                debug!(
                    url = %url,
                    candidate = %self.controls[found.index],
                    selector = %found.click_selector,
                    "Next control found"
                );
                Detected::Click(found)
            }
            None => Detected::SinglePage,
        }
    }

    async fn url_loop(
        &self,
        session: &mut dyn RenderSession,
        mut pagination: UrlPagination,
        run: &mut Traversal,
    ) {
        while run.state.pages_fetched < self.config.pagination.max_pages {
            let Some(next_url) = pagination.next_url() else {
                debug!(url = %run.url, page = pagination.current, "No page number after the current one");
                return;
            };
            let page_index = run.state.current_page_index + 1;

            let page = match session.fetch(&next_url).await {
                Ok(page) => page,
                Err(e) => {
                    run.fail(page_index, &e);
                    return;
                }
            };
            run.state.page_fetched();
            pagination.advance();

            let added = self.process(&page, run).await;
            if run.state.record_new(added) {
                debug!(url = %run.url, page = page_index, "No new records on consecutive pages");
                return;
            }
        }
        debug!(url = %run.url, max_pages = self.config.pagination.max_pages, "Page cap reached");
    }

    async fn click_loop(
        &self,
        session: &mut dyn RenderSession,
        control: &NextControl,
        mut selector: String,
        first: PageFetchResult,
        run: &mut Traversal,
    ) {
        let timeout = Duration::from_millis(self.config.pagination.wait_timeout_ms);
        let mut previous = first.fingerprint();
        drop(first);

        while run.state.pages_fetched < self.config.pagination.max_pages {
            let page_index = run.state.current_page_index + 1;

            let outcome = match session.click_and_wait(&selector, timeout).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    run.fail(page_index, &e);
                    return;
                }
            };
            if !outcome.changed {
                debug!(url = %run.url, page = page_index, "Content did not change after click");
                return;
            }

            let fingerprint = outcome.page.fingerprint();
            if fingerprint == previous {
                let loop_error = ExtractionError::PaginationLoopDetected {
                    url: run.url.clone(),
                    page: page_index,
                };
                warn!(url = %run.url, page = page_index, "Next control did not advance content");
                run.diagnostics.push(
                    Diagnostic::new(&run.url, DiagnosticKind::PaginationLoop, loop_error.to_string())
                        .on_page(page_index),
                );
                return;
            }
            previous = fingerprint;
            run.state.page_fetched();

            let added = self.process(&outcome.page, run).await;
            if run.state.record_new(added) {
                debug!(url = %run.url, page = page_index, "No new records on consecutive pages");
                return;
            }

            match locate_control(&outcome.page.raw_html, control) {
                Some(next) => selector = next,
                None => {
                    debug!(url = %run.url, page = page_index, "Next control absent or disabled");
                    return;
                }
            }
        }
        debug!(url = %run.url, max_pages = self.config.pagination.max_pages, "Page cap reached");
    }

    /// Extract one page into the aggregate. Returns the number of new records.
    async fn process(&self, page: &PageFetchResult, run: &mut Traversal) -> usize {
        let page_index = run.state.current_page_index;
        let extraction =
            extract_page(page, page_index, self.backend, self.schema, self.config).await;

        run.diagnostics.extend(extraction.diagnostics);
        let summary = run.aggregator.merge(extraction.records);
        debug!(
            url = %run.url,
            page = page_index,
            added = summary.added,
            filled = summary.filled,
            total = run.aggregator.len(),
            "Merged page"
        );
        summary.added
    }
}
