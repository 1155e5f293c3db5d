//! Plain HTTP renderer.
//!
//! Fetches server-rendered HTML and converts it to Markdown-like text. No
//! JavaScript runs, so click pagination is unsupported; URL-parameter
//! pagination works.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{RenderError, RenderResult};
use crate::html::html_to_text;
use crate::traits::renderer::{RenderSession, Renderer, SessionOptions};
use crate::types::page::{ClickOutcome, PageFetchResult};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Renderer backed by a `reqwest` client.
///
/// # Example
///
/// ```rust,ignore
/// let renderer = HttpRenderer::new()?.with_timeout(Duration::from_secs(10));
/// let crawler = StaffCrawler::new(renderer, backend, config)?;
/// ```
#[derive(Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpRenderer {
    /// Create a renderer with a 30 second request timeout.
    pub fn new() -> RenderResult<Self> {
        Self::build(Duration::from_secs(30), DEFAULT_USER_AGENT)
    }

    /// Replace the request timeout.
    pub fn with_timeout(self, timeout: Duration) -> RenderResult<Self> {
        Self::build(timeout, &self.user_agent)
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build(timeout: Duration, user_agent: &str) -> RenderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| RenderError::navigation("<client>", e))?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        if !options.headless {
            debug!("HTTP renderer has no visible mode; ignoring headed option");
        }
        Ok(Box::new(HttpSession {
            renderer: self.clone(),
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

struct HttpSession {
    renderer: HttpRenderer,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn fetch(&mut self, url: &str) -> RenderResult<PageFetchResult> {
        Url::parse(url).map_err(|_| RenderError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .renderer
            .client
            .get(url)
            .header("User-Agent", &self.renderer.user_agent)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::navigation(url, format!("HTTP {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;
        let text = html_to_text(&html);
        debug!(url = %url, bytes = html.len(), "HTTP fetch complete");

        Ok(PageFetchResult::new(url, html, text))
    }

    async fn click_and_wait(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> RenderResult<ClickOutcome> {
        Err(RenderError::Unsupported {
            renderer: "http".to_string(),
            operation: "click_and_wait",
        })
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else {
        RenderError::navigation(url, error)
    }
}
