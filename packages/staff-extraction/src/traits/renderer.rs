//! Renderer trait: the headless-browser boundary.
//!
//! A [`Renderer`] hands out [`RenderSession`]s. Each pagination traversal
//! acquires its own session, so concurrent traversals never share browsing
//! state. A session is released when it is closed or dropped.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut session = renderer.open_session(&SessionOptions::default()).await?;
//! let page = session.fetch("https://example.com/staff").await?;
//! let next = session.click_and_wait("li.next > a", Duration::from_secs(5)).await?;
//! if next.changed { /* extract from next.page */ }
//! session.close().await;
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::error::RenderResult;
use crate::types::page::{ClickOutcome, PageFetchResult};

/// Options for a rendering context.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Render without a visible window
    pub headless: bool,

    /// CSS selector of the region watched for change after a click
    pub content_selector: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            content_selector: "body".to_string(),
        }
    }
}

impl SessionOptions {
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_content_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = selector.into();
        self
    }
}

/// Source of rendering contexts.
///
/// Implementations:
/// - `FirecrawlRenderer` - Firecrawl API (JavaScript rendering, click actions)
/// - `HttpRenderer` - Plain HTTP, no JavaScript, no clicks
/// - `MockRenderer` - Canned pages for tests
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire an isolated rendering context for one traversal.
    async fn open_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>>;

    /// Get the renderer name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// One browsing context. Not shared between traversals.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to a URL and return the rendered page.
    ///
    /// Fails with `RenderError::Timeout` when the page does not become ready
    /// and `RenderError::Navigation` for network/DNS/HTTP failures.
    async fn fetch(&mut self, url: &str) -> RenderResult<PageFetchResult>;

    /// Click the element matched by `selector` on the current page and wait
    /// up to `timeout` for the watched content region to change.
    async fn click_and_wait(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> RenderResult<ClickOutcome>;

    /// Release the context.
    async fn close(self: Box<Self>) {}
}
