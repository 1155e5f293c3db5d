//! End-to-end tests for the crawler facade.
//!
//! These tests verify the full workflow over mock collaborators:
//! 1. Classify each page and pick pattern or model extraction
//! 2. Contain page and URL failures as diagnostics
//! 3. Run several URLs with bounded concurrency, keeping input order
//! 4. Export the result as CSV

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use staff_extraction::{
    export_csv,
    testing::MockInferenceFailure,
    ChunkConfig, CrawlerConfig, DiagnosticKind, MockModel, MockRenderer, StaffCrawler,
    StaffRecord,
};

const EMBEDDED_HTML: &str = r#"<html><body>
    <div class="staff"><a href="mailto:bob@x.org">Bob Smith</a> Teacher</div>
    <div class="staff"><a aria-label="Send message to Jane Doe at jane@x.org" href="/contact/7">Contact</a></div>
</body></html>"#;

const EMBEDDED_TEXT: &str = "Our Staff\nBob Smith Teacher\nContact";

fn visible_page(lines: &str) -> String {
    format!("<html><body><pre>{}</pre></body></html>", lines)
}

#[tokio::test]
async fn test_embedded_page_never_calls_the_model() {
    let model = MockModel::line_parser();
    let renderer = MockRenderer::new().with_page("https://s.org/staff", EMBEDDED_HTML, EMBEDDED_TEXT);
    let crawler = StaffCrawler::new(renderer, model.clone(), CrawlerConfig::default()).unwrap();

    let report = crawler.extract("https://s.org/staff").await;

    let emails: Vec<_> = report.records.iter().filter_map(|r| r.email.clone()).collect();
    assert_eq!(emails, vec!["jane@x.org", "bob@x.org"]);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_visible_page_uses_the_model_at_zero_temperature() {
    let text = "Ann Lee | Principal | ann@x.org\nBob Ray | Teacher | bob@x.org\n";
    let model = MockModel::line_parser();
    let renderer = MockRenderer::new().with_page("https://s.org/staff", &visible_page(text), text);
    let crawler = StaffCrawler::new(renderer, model.clone(), CrawlerConfig::default()).unwrap();

    let report = crawler.extract("https://s.org/staff").await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].role.as_deref(), Some("Principal"));
    assert_eq!(model.call_count(), 1);
    let call = &model.calls()[0];
    assert_eq!(call.temperature, 0.0);
    assert_eq!(call.schema_name, "staff_directory");
}

#[tokio::test]
async fn test_failed_chunk_keeps_other_chunks() {
    // 93 bytes of good rows, then a row that lands in a second chunk
    let text = "Ann Lee | Principal | ann@x.org\n\
                Bob Ray | Teacher | bob@x.org\n\
                Cy Pell | Counselor | cy@x.org\n\
                Zed Last | Coach | zed@x.org BOOM\n";
    let model = MockModel::line_parser().with_failure("BOOM", MockInferenceFailure::Malformed);
    let renderer = MockRenderer::new().with_page("https://s.org/staff", &visible_page(text), text);
    let config = CrawlerConfig::default().with_chunking(ChunkConfig {
        chunk_chars: 100,
        overlap_rate: 0.0,
    });
    let crawler = StaffCrawler::new(renderer, model.clone(), config).unwrap();

    let report = crawler.extract("https://s.org/staff").await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Ann Lee", "Bob Ray", "Cy Pell"]);
    assert_eq!(model.call_count(), 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Inference);
    assert_eq!(report.diagnostics[0].page, Some(1));
    assert!(report.diagnostics[0].message.starts_with("chunk 2:"));
}

#[tokio::test]
async fn test_fallback_to_model_for_unmatched_embedded_page() {
    // The only mailto link is labelled "Email", so no pattern fires
    let html = r#"<p>Dana Fox, Librarian <a href="mailto:dana@x.org">Email</a></p>"#;
    let text = "Dana Fox, Librarian Email";
    let dana = StaffRecord::new("Dana Fox", Some("Librarian"), Some("dana@x.org")).unwrap();

    let model = MockModel::new().with_response("Dana", vec![dana.clone()]);
    let renderer = MockRenderer::new().with_page("https://s.org/staff", html, text);

    let strict = StaffCrawler::new(renderer.clone(), model.clone(), CrawlerConfig::default()).unwrap();
    assert!(strict.extract("https://s.org/staff").await.is_empty());
    assert_eq!(model.call_count(), 0);

    let config = CrawlerConfig::default().with_fallback_to_model(true);
    let lenient = StaffCrawler::new(renderer, model.clone(), config).unwrap();
    let report = lenient.extract("https://s.org/staff").await;
    assert_eq!(report.records, vec![dana]);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_extract_many_keeps_input_order_and_contains_failures() {
    let renderer = MockRenderer::new()
        .with_page(
            "https://a.org/staff",
            r#"<a href="mailto:ann@a.org">Ann Lee</a>"#,
            "Ann Lee",
        )
        .with_page(
            "https://c.org/staff",
            r#"<a href="mailto:cy@c.org">Cy Pell</a>"#,
            "Cy Pell",
        )
        .with_latency(Duration::from_millis(5));
    let config = CrawlerConfig::default().with_concurrency(2);
    let crawler = StaffCrawler::new(renderer.clone(), MockModel::new(), config).unwrap();

    let urls = vec![
        "https://a.org/staff".to_string(),
        "https://b.org/staff".to_string(),
        "https://c.org/staff".to_string(),
    ];
    let batch = crawler.extract_many(&urls).await;

    assert_eq!(batch.reports.len(), 3);
    let report_urls: Vec<_> = batch.reports.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(report_urls, vec!["https://a.org/staff", "https://b.org/staff", "https://c.org/staff"]);

    // The unreachable URL yields an empty set, not an aborted batch
    assert!(batch.reports[1].records.is_empty());
    assert_eq!(batch.reports[1].diagnostics[0].kind, DiagnosticKind::Navigation);

    let names: Vec<_> = batch.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Ann Lee", "Cy Pell"]);
    assert_eq!(renderer.sessions_opened(), 3);
}

#[tokio::test]
async fn test_url_timeout_yields_zero_records() {
    let renderer = MockRenderer::new()
        .with_page(
            "https://s.org/staff",
            r#"<a href="mailto:ann@s.org">Ann Lee</a>"#,
            "Ann Lee",
        )
        .with_latency(Duration::from_millis(500));
    let config = CrawlerConfig::default().with_url_timeout_ms(20);
    let crawler = StaffCrawler::new(renderer, MockModel::new(), config).unwrap();

    let report = crawler.extract_with_pagination("https://s.org/staff").await;

    assert!(report.records.is_empty());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Aborted);
    assert!(report.diagnostics[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_cancelled_batch_yields_aborted_reports() {
    let renderer = MockRenderer::new()
        .with_page("https://s.org/staff", "<p>Staff</p>", "Staff")
        .with_latency(Duration::from_secs(5));
    let crawler = StaffCrawler::new(renderer, MockModel::new(), CrawlerConfig::default()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let urls = vec!["https://s.org/staff".to_string(), "https://s.org/staff".to_string()];
    let batch = crawler.extract_many_with_cancel(&urls, cancel).await;

    assert_eq!(batch.reports.len(), 2);
    assert!(batch.records().is_empty());
    assert!(batch
        .diagnostics()
        .all(|d| d.kind == DiagnosticKind::Aborted && d.message == "operation cancelled"));
}

#[tokio::test]
async fn test_results_export_to_csv() {
    let renderer = MockRenderer::new().with_page("https://s.org/staff", EMBEDDED_HTML, EMBEDDED_TEXT);
    let crawler = StaffCrawler::new(renderer, MockModel::new(), CrawlerConfig::default()).unwrap();
    let report = crawler.extract("https://s.org/staff").await;

    let dir = tempfile::tempdir().unwrap();
    let path = export_csv(&report.records, dir.path().join("results"), "staff").unwrap();

    let csv = std::fs::read_to_string(path).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "name,role,email");
    assert_eq!(lines[1], "Jane Doe,,jane@x.org");
    assert_eq!(lines[2], "Bob Smith,,bob@x.org");
}
