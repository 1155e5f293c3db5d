//! Mock renderer for testing.
//!
//! Serves canned pages by URL and canned click sequences, optionally from a
//! page generator, and records every call for verification.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{RenderError, RenderResult};
use crate::html::region_fingerprint;
use crate::traits::renderer::{RenderSession, Renderer, SessionOptions};
use crate::types::page::{ClickOutcome, PageFetchResult};

type PageGenerator = dyn Fn(&str) -> Option<PageFetchResult> + Send + Sync;

/// A failure the mock should produce for a URL.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Timeout,
    Navigation(String),
}

impl MockFailure {
    fn to_error(&self, url: &str) -> RenderError {
        match self {
            Self::Timeout => RenderError::Timeout {
                url: url.to_string(),
            },
            Self::Navigation(reason) => RenderError::navigation(url, reason.clone()),
        }
    }
}

/// One recorded renderer interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Fetch(String),
    Click(String),
}

/// Mock renderer for testing.
///
/// # Example
///
/// ```rust
/// use staff_extraction::renderers::MockRenderer;
///
/// let renderer = MockRenderer::new()
///     .with_page("https://s.org/staff", r#"<a href="mailto:bob@x.org">Bob Smith</a>"#, "Bob Smith");
/// ```
#[derive(Default, Clone)]
pub struct MockRenderer {
    /// Canned pages indexed by URL
    pages: Arc<RwLock<HashMap<String, PageFetchResult>>>,
    /// Pages returned by successive clicks, indexed by the starting URL
    clicks: Arc<RwLock<HashMap<String, Vec<PageFetchResult>>>>,
    /// Fallback for URLs without a canned page
    generator: Option<Arc<PageGenerator>>,
    failures: Arc<RwLock<HashMap<String, MockFailure>>>,
    latency: Option<Duration>,
    calls: Arc<RwLock<Vec<MockCall>>>,
    sessions_opened: Arc<RwLock<usize>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page returned for `url`.
    pub fn add_page(&self, url: &str, raw_html: &str, rendered_text: &str) {
        self.pages
            .write()
            .unwrap()
            .insert(url.to_string(), PageFetchResult::new(url, raw_html, rendered_text));
    }

    /// Builder form of [`add_page`](Self::add_page).
    pub fn with_page(self, url: &str, raw_html: &str, rendered_text: &str) -> Self {
        self.add_page(url, raw_html, rendered_text);
        self
    }

    /// Pages produced by clicking next, in order, after fetching `url`.
    /// Clicking past the end reports no change.
    pub fn with_click_sequence(self, url: &str, pages: Vec<(&str, &str)>) -> Self {
        let pages = pages
            .into_iter()
            .map(|(html, text)| PageFetchResult::new(url, html, text))
            .collect();
        self.clicks.write().unwrap().insert(url.to_string(), pages);
        self
    }

    /// Serve URLs without a canned page from a generator.
    pub fn with_generator(
        mut self,
        generator: impl Fn(&str) -> Option<PageFetchResult> + Send + Sync + 'static,
    ) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Make fetches of `url` fail.
    pub fn with_failure(self, url: &str, failure: MockFailure) -> Self {
        self.failures
            .write()
            .unwrap()
            .insert(url.to_string(), failure);
        self
    }

    /// Delay every fetch and click.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs requested via fetch.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Fetch(url) => Some(url),
                MockCall::Click(_) => None,
            })
            .collect()
    }

    /// Number of page loads (fetches plus clicks).
    pub fn page_loads(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn sessions_opened(&self) -> usize {
        *self.sessions_opened.read().unwrap()
    }

    fn lookup(&self, url: &str) -> RenderResult<PageFetchResult> {
        if let Some(failure) = self.failures.read().unwrap().get(url) {
            return Err(failure.to_error(url));
        }
        if let Some(page) = self.pages.read().unwrap().get(url) {
            return Ok(page.clone());
        }
        self.generator
            .as_ref()
            .and_then(|generate| generate(url))
            .ok_or_else(|| RenderError::navigation(url, "HTTP 404 Not Found"))
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn open_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        *self.sessions_opened.write().unwrap() += 1;
        Ok(Box::new(MockSession {
            renderer: self.clone(),
            content_selector: options.content_selector.clone(),
            start_url: None,
            clicks_made: 0,
            region: None,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    renderer: MockRenderer,
    content_selector: String,
    start_url: Option<String>,
    clicks_made: usize,
    region: Option<String>,
}

#[async_trait]
impl RenderSession for MockSession {
    async fn fetch(&mut self, url: &str) -> RenderResult<PageFetchResult> {
        self.renderer
            .calls
            .write()
            .unwrap()
            .push(MockCall::Fetch(url.to_string()));
        if let Some(latency) = self.renderer.latency {
            tokio::time::sleep(latency).await;
        }

        let page = self.renderer.lookup(url)?;
        self.start_url = Some(url.to_string());
        self.clicks_made = 0;
        self.region = Some(region_fingerprint(&page.raw_html, &self.content_selector));
        Ok(page)
    }

    async fn click_and_wait(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> RenderResult<ClickOutcome> {
        self.renderer
            .calls
            .write()
            .unwrap()
            .push(MockCall::Click(selector.to_string()));
        if let Some(latency) = self.renderer.latency {
            tokio::time::sleep(latency).await;
        }

        let start = self.start_url.clone().ok_or(RenderError::NoPage)?;
        let next = self
            .renderer
            .clicks
            .read()
            .unwrap()
            .get(&start)
            .and_then(|seq| seq.get(self.clicks_made).cloned());

        let page = match next {
            Some(page) => {
                self.clicks_made += 1;
                page
            }
            None => {
                // Past the end: content stays as it was
                let current = match self.clicks_made {
                    0 => self.renderer.lookup(&start)?,
                    n => self.renderer.clicks.read().unwrap()[&start][n - 1].clone(),
                };
                return Ok(ClickOutcome {
                    page: current,
                    changed: false,
                });
            }
        };

        let region = region_fingerprint(&page.raw_html, &self.content_selector);
        let changed = self.region.as_deref() != Some(region.as_str());
        self.region = Some(region);
        Ok(ClickOutcome { page, changed })
    }
}
