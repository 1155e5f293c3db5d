//! Integration tests for pagination traversal.
//!
//! These tests drive the full crawler against the mock renderer:
//! 1. Fetch page 1 and detect the pagination style
//! 2. Walk the URL-parameter or click loop
//! 3. Stop on the page cap, repeated content or a missing control
//! 4. Aggregate records across pages

use staff_extraction::{
    renderers::{MockCall, MockFailure},
    CrawlerConfig, DiagnosticKind, MockModel, MockRenderer, PageFetchResult, PaginationConfig,
    StaffCrawler,
};

/// Markup for people `ids`, emails only in `mailto:` hrefs.
fn people_html(ids: impl IntoIterator<Item = usize>) -> String {
    ids.into_iter()
        .map(|i| format!(r#"<p><a href="mailto:person{i}@s.org">Person Number{i}</a> Teacher</p>"#))
        .collect()
}

/// Page number from `?page=N`, 1 when absent.
fn page_number(url: &str) -> Option<usize> {
    match url.split_once("page=") {
        Some((_, n)) => n.split('&').next()?.parse().ok(),
        None => Some(1),
    }
}

fn crawler(renderer: MockRenderer, config: CrawlerConfig) -> StaffCrawler<MockRenderer, MockModel> {
    StaffCrawler::new(renderer, MockModel::new(), config).unwrap()
}

fn names(report: &staff_extraction::ExtractionReport) -> Vec<String> {
    report.records.iter().map(|r| r.name.clone()).collect()
}

const NEXT_LINK: &str = r##"<ul class="pager"><li class="next"><a href="#">Next</a></li></ul>"##;

#[tokio::test]
async fn test_url_loop_stops_when_pages_repeat() {
    // Pages 1 and 2 are distinct, every later page repeats page 2
    let renderer = MockRenderer::new().with_generator(|url| {
        let n = page_number(url)?;
        let ids = match n {
            1 => 0..3,
            _ => 3..6,
        };
        Some(PageFetchResult::new(url, people_html(ids), "Staff directory"))
    });
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler
        .extract_with_pagination("https://s.org/staff?page=1")
        .await;

    assert_eq!(report.pages_visited, 4);
    assert_eq!(report.records.len(), 6);
    assert_eq!(
        renderer.fetched_urls(),
        vec![
            "https://s.org/staff?page=1",
            "https://s.org/staff?page=2",
            "https://s.org/staff?page=3",
            "https://s.org/staff?page=4",
        ]
    );
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn test_max_pages_caps_page_loads() {
    // Every page has new people and a link onwards
    let renderer = MockRenderer::new().with_generator(|url| {
        let n = page_number(url)?;
        let html = format!(
            r#"{}<a href="/staff?page={}">next</a>"#,
            people_html([n * 10, n * 10 + 1]),
            n + 1
        );
        Some(PageFetchResult::new(url, html, "Staff"))
    });
    let config =
        CrawlerConfig::default().with_pagination(PaginationConfig::default().with_max_pages(2));
    let crawler = crawler(renderer.clone(), config);

    let report = crawler.extract_with_pagination("https://s.org/staff").await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(renderer.page_loads(), 2);
    assert_eq!(report.records.len(), 4);
}

#[tokio::test]
async fn test_three_page_directory_keeps_first_seen_order() {
    // 7 + 7 + 6 people, then empty result pages
    let renderer = MockRenderer::new().with_generator(|url| {
        let n = page_number(url)?;
        let ids = match n {
            1 => 0..7,
            2 => 7..14,
            3 => 14..20,
            _ => 0..0,
        };
        let html = format!(
            r#"{}<div class="pages"><a href="/staff?page=2">2</a><a href="/staff?page=3">3</a></div>"#,
            people_html(ids)
        );
        Some(PageFetchResult::new(url, html, "Staff directory"))
    });
    let crawler = crawler(renderer, CrawlerConfig::default());

    let report = crawler.extract_with_pagination("https://s.org/staff").await;

    let expected: Vec<String> = (0..20).map(|i| format!("Person Number{i}")).collect();
    assert_eq!(names(&report), expected);
    assert!(report.records.iter().all(|r| r.email.is_some()));
    // Two empty pages after page 3 end the loop
    assert_eq!(report.pages_visited, 5);
}

#[tokio::test]
async fn test_failure_mid_loop_keeps_records() {
    let renderer = MockRenderer::new()
        .with_generator(|url| {
            let n = page_number(url)?;
            Some(PageFetchResult::new(url, people_html([n]), "Staff"))
        })
        .with_failure("https://s.org/staff?page=3", MockFailure::Timeout);
    let crawler = crawler(renderer, CrawlerConfig::default());

    let report = crawler
        .extract_with_pagination("https://s.org/staff?page=1")
        .await;

    assert_eq!(names(&report), vec!["Person Number1", "Person Number2"]);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::RenderTimeout);
    assert_eq!(report.diagnostics[0].page, Some(3));
}

#[tokio::test]
async fn test_click_loop_follows_sequence_until_control_disappears() {
    let url = "https://s.org/directory";
    let page2 = format!("{}{}", people_html(2..4), NEXT_LINK);
    let page3 = people_html(4..6);
    let renderer = MockRenderer::new()
        .with_page(url, &format!("{}{}", people_html(0..2), NEXT_LINK), "page one")
        .with_click_sequence(url, vec![(page2.as_str(), "page two"), (page3.as_str(), "page three")]);
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records.len(), 6);
    let calls = renderer.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], MockCall::Fetch(url.to_string()));
    assert!(matches!(calls[1], MockCall::Click(_)));
    assert!(matches!(calls[2], MockCall::Click(_)));
}

#[tokio::test]
async fn test_click_without_change_stops() {
    let url = "https://s.org/directory";
    let page2 = format!("{}{}", people_html(2..4), NEXT_LINK);
    let renderer = MockRenderer::new()
        .with_page(url, &format!("{}{}", people_html(0..2), NEXT_LINK), "page one")
        .with_click_sequence(url, vec![(page2.as_str(), "page two")]);
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler.extract_with_pagination(url).await;

    // Third load is the no-change click
    assert_eq!(renderer.page_loads(), 3);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records.len(), 4);
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn test_click_that_repeats_content_is_a_loop() {
    let url = "https://s.org/directory";
    let page1 = format!("{}{}", people_html(0..2), NEXT_LINK);
    // Watched region changes, rendered text is identical
    let page2 = format!(r#"<span class="counter">2</span>{}"#, page1);
    let renderer = MockRenderer::new()
        .with_page(url, &page1, "same text")
        .with_click_sequence(url, vec![(page2.as_str(), "same text")]);
    let crawler = crawler(renderer, CrawlerConfig::default());

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::PaginationLoop);
    assert_eq!(report.diagnostics[0].page, Some(2));
}

#[tokio::test]
async fn test_disabled_control_means_single_page() {
    let url = "https://s.org/directory";
    let html = format!(
        r##"{}<ul><li class="next disabled"><a href="#">Next</a></li></ul>"##,
        people_html(0..2)
    );
    let renderer = MockRenderer::new().with_page(url, &html, "page one");
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(report.pages_visited, 1);
    assert_eq!(renderer.calls(), vec![MockCall::Fetch(url.to_string())]);
}

#[tokio::test]
async fn test_custom_text_control() {
    let url = "https://s.org/directorio";
    let next = r##"<nav><button type="button">Siguiente &rsaquo;</button></nav>"##;
    let renderer = MockRenderer::new()
        .with_page(url, &format!("{}{}", people_html(0..1), next), "uno")
        .with_click_sequence(url, vec![(people_html(1..2).as_str(), "dos")]);
    let config = CrawlerConfig::default().with_pagination(
        PaginationConfig::default().with_next_button_selector("button:has-text('Siguiente')"),
    );
    let crawler = crawler(renderer.clone(), config);

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(report.pages_visited, 2);
    assert!(matches!(&renderer.calls()[1], MockCall::Click(sel) if sel.ends_with("button:nth-of-type(1)")));
}

#[tokio::test]
async fn test_click_loop_respects_max_pages() {
    let url = "https://s.org/directory";
    let pages: Vec<String> = (1..10)
        .map(|i| format!("{}{}", people_html([i * 2, i * 2 + 1]), NEXT_LINK))
        .collect();
    let sequence: Vec<(&str, &str)> = pages.iter().map(|p| (p.as_str(), "more people")).collect();
    let renderer = MockRenderer::new()
        .with_page(url, &format!("{}{}", people_html(0..2), NEXT_LINK), "page one")
        .with_click_sequence(url, sequence);
    let config =
        CrawlerConfig::default().with_pagination(PaginationConfig::default().with_max_pages(2));
    let crawler = crawler(renderer.clone(), config);

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records.len(), 4);
    let calls = renderer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], MockCall::Fetch(url.to_string()));
    assert!(matches!(calls[1], MockCall::Click(_)));
}

#[tokio::test]
async fn test_unrelated_page_links_do_not_replace_next_control() {
    let url = "https://s.org/staff";
    let page1 = format!(
        r#"<header><a href="/news?p=42">Latest news</a></header>{}{}"#,
        people_html(0..1),
        NEXT_LINK
    );
    let page2 = people_html(1..2);
    let renderer = MockRenderer::new()
        .with_page(url, &page1, "page one")
        .with_click_sequence(url, vec![(page2.as_str(), "page two")]);
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler.extract_with_pagination(url).await;

    assert_eq!(names(&report), vec!["Person Number0", "Person Number1"]);
    assert_eq!(renderer.fetched_urls(), vec![url.to_string()]);
    assert!(matches!(renderer.calls()[1], MockCall::Click(_)));
}

#[tokio::test]
async fn test_last_page_number_ends_url_loop() {
    let renderer = MockRenderer::new().with_generator(|url| {
        let n = page_number(url)?;
        Some(PageFetchResult::new(url, people_html([n]), "Staff"))
    });
    let crawler = crawler(renderer.clone(), CrawlerConfig::default());

    let report = crawler
        .extract_with_pagination("https://s.org/staff?page=4294967295")
        .await;

    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(renderer.fetched_urls(), vec!["https://s.org/staff?page=4294967295"]);
    assert!(report.diagnostics.is_empty());
}
