//! The StaffCrawler - main entry point for the library.
//!
//! Wires a [`Renderer`] and a [`ModelBackend`] to the pagination
//! controller. Every traversal opens its own render session, so
//! [`StaffCrawler::extract_many`] can run URLs concurrently without shared
//! browsing state.
//!
//! Failures below configuration level never escape: a URL that cannot be
//! fetched, times out or is cancelled yields a report with zero records and
//! a diagnostic.

use futures::{stream, StreamExt};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::controls::{parse_next_controls, NextControl};
use crate::pipeline::pagination::PaginationController;
use crate::traits::model::ModelBackend;
use crate::traits::renderer::{Renderer, SessionOptions};
use crate::types::config::CrawlerConfig;
use crate::types::report::{BatchReport, Diagnostic, DiagnosticKind, ExtractionReport};
use crate::types::schema::RecordSchema;

/// Hybrid pattern/model staff-directory crawler.
///
/// # Example
///
/// ```rust,ignore
/// let crawler = StaffCrawler::new(renderer, backend, CrawlerConfig::from_env()?)?;
///
/// // One page
/// let report = crawler.extract("https://school.org/staff").await;
///
/// // Follow pagination
/// let report = crawler.extract_with_pagination("https://school.org/staff").await;
///
/// // Several directories, bounded concurrency, input order kept
/// let batch = crawler.extract_many(&urls).await;
/// ```
pub struct StaffCrawler<R: Renderer, M: ModelBackend> {
    renderer: R,
    backend: M,
    config: CrawlerConfig,
    controls: Vec<NextControl>,
    schema: RecordSchema,
}

impl<R: Renderer, M: ModelBackend> StaffCrawler<R, M> {
    /// Create a crawler. Fails only on invalid configuration.
    pub fn new(renderer: R, backend: M, config: CrawlerConfig) -> Result<Self> {
        config.validate()?;
        let controls = parse_next_controls(&config.pagination.next_button_selector)?;

        Ok(Self {
            renderer,
            backend,
            config,
            controls,
            schema: RecordSchema::staff_directory(),
        })
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn backend(&self) -> &M {
        &self.backend
    }

    /// Extract records from page 1 only.
    pub async fn extract(&self, url: &str) -> ExtractionReport {
        self.run_url(url, false, None).await
    }

    /// Extract records, following pagination until a stop condition.
    pub async fn extract_with_pagination(&self, url: &str) -> ExtractionReport {
        self.run_url(url, true, None).await
    }

    /// Extract with cancellation support.
    ///
    /// Unlike the other entry points, cancellation is reported as
    /// [`ExtractionError::Cancelled`] instead of an empty report.
    pub async fn extract_with_cancel(
        &self,
        url: &str,
        paginate: bool,
        cancel: CancellationToken,
    ) -> Result<ExtractionReport> {
        tokio::select! {
            report = self.run_url(url, paginate, None) => Ok(report),
            _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
        }
    }

    /// Extract several directories concurrently (bounded by
    /// `config.concurrency`). Reports keep input order.
    pub async fn extract_many(&self, urls: &[String]) -> BatchReport {
        self.extract_many_inner(urls, None).await
    }

    /// [`extract_many`](Self::extract_many) with a shared cancellation token.
    /// URLs still running when the token fires contribute zero records.
    pub async fn extract_many_with_cancel(
        &self,
        urls: &[String],
        cancel: CancellationToken,
    ) -> BatchReport {
        self.extract_many_inner(urls, Some(&cancel)).await
    }

    async fn extract_many_inner(
        &self,
        urls: &[String],
        cancel: Option<&CancellationToken>,
    ) -> BatchReport {
        info!(
            urls = urls.len(),
            concurrency = self.config.concurrency,
            "Starting batch extraction"
        );

        let reports: Vec<ExtractionReport> = stream::iter(urls)
            .map(|url| self.run_url(url, true, cancel))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let batch = BatchReport { reports };
        info!(
            records = batch.records().len(),
            pages = batch.pages_visited(),
            diagnostics = batch.diagnostics().count(),
            "Batch extraction complete"
        );
        batch
    }

    /// One URL with the overall timeout and cancellation applied.
    async fn run_url(
        &self,
        url: &str,
        paginate: bool,
        cancel: Option<&CancellationToken>,
    ) -> ExtractionReport {
        let started = Instant::now();
        let traversal = self.traverse(url, paginate);

        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let deadline = async {
            match self.config.url_timeout_ms {
                Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                None => std::future::pending().await,
            }
        };

        let aborted = tokio::select! {
            report = traversal => return report,
            _ = cancelled => ExtractionError::Cancelled,
            _ = deadline => ExtractionError::TimedOut {
                url: url.to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        };

        // Partial results are discarded
        warn!(url = %url, error = %aborted, "Traversal aborted");
        ExtractionReport::failed(
            url,
            Diagnostic::new(url, DiagnosticKind::Aborted, aborted.to_string()),
        )
    }

    async fn traverse(&self, url: &str, paginate: bool) -> ExtractionReport {
        let options = SessionOptions::default()
            .with_headless(self.config.headless)
            .with_content_selector(&self.config.pagination.content_selector);

        let mut session = match self.renderer.open_session(&options).await {
            Ok(session) => session,
            Err(e) => {
                warn!(url = %url, renderer = self.renderer.name(), error = %e, "Could not open render session");
                return ExtractionReport::failed(
                    url,
                    Diagnostic::new(url, DiagnosticKind::Navigation, e.to_string()),
                );
            }
        };

        let controller =
            PaginationController::new(&self.backend, &self.schema, &self.config, &self.controls);
        let report = controller.traverse(session.as_mut(), url, paginate).await;
        session.close().await;

        if report.is_empty() {
            warn!(url = %url, diagnostics = report.diagnostics.len(), "No records extracted");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderers::MockRenderer;
    use crate::testing::MockModel;
    use crate::types::config::PaginationConfig;

    #[test]
    fn test_invalid_selector_is_fatal() {
        let config = CrawlerConfig::default()
            .with_pagination(PaginationConfig::default().with_next_button_selector("a[[["));
        let result = StaffCrawler::new(MockRenderer::new(), MockModel::new(), config);
        assert!(matches!(result, Err(ExtractionError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_url_yields_empty_report() {
        let crawler =
            StaffCrawler::new(MockRenderer::new(), MockModel::new(), CrawlerConfig::default())
                .unwrap();
        let report = crawler.extract("https://s.org/missing").await;

        assert!(report.records.is_empty());
        assert_eq!(report.pages_visited, 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Navigation);
    }

    #[tokio::test]
    async fn test_extract_is_single_page() {
        let renderer = MockRenderer::new()
            .with_page(
                "https://s.org/staff",
                r#"<a href="mailto:bob@x.org">Bob Smith</a><a href="https://s.org/staff?page=2">2</a>"#,
                "Bob Smith 2",
            )
            .with_page(
                "https://s.org/staff?page=2",
                r#"<a href="mailto:cy@x.org">Cy Pell</a>"#,
                "Cy Pell",
            );
        let crawler =
            StaffCrawler::new(renderer.clone(), MockModel::new(), CrawlerConfig::default())
                .unwrap();

        let report = crawler.extract("https://s.org/staff").await;
        assert_eq!(report.pages_visited, 1);
        assert_eq!(renderer.fetched_urls(), vec!["https://s.org/staff"]);
        assert_eq!(report.records[0].name, "Bob Smith");
    }

    #[tokio::test]
    async fn test_cancel_returns_cancelled() {
        let renderer = MockRenderer::new()
            .with_page("https://s.org/staff", "<p>x</p>", "x")
            .with_latency(Duration::from_secs(5));
        let crawler =
            StaffCrawler::new(renderer, MockModel::new(), CrawlerConfig::default()).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = crawler
            .extract_with_cancel("https://s.org/staff", true, token)
            .await;
        assert!(matches!(result, Err(ExtractionError::Cancelled)));
    }
}
