//! Firecrawl-based renderer.
//!
//! Uses the Firecrawl `/scrape` API for JavaScript rendering. Firecrawl is
//! stateless, so a session remembers the URL and the clicks made so far and
//! replays them as `actions` on every call. Whether a click changed the page
//! is decided by comparing the watched region's fingerprint before and after.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult, RenderError, RenderResult};
use crate::html::region_fingerprint;
use crate::security::SecretString;
use crate::traits::renderer::{RenderSession, Renderer, SessionOptions};
use crate::types::page::{ClickOutcome, PageFetchResult};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Environment variable holding the Firecrawl key.
pub const FIRECRAWL_KEY_VAR: &str = "FIRECRAWL_API_KEY";

/// Firecrawl-backed renderer for JavaScript-heavy directories.
///
/// # Example
///
/// ```rust,ignore
/// let renderer = FirecrawlRenderer::from_env()?;
/// let crawler = StaffCrawler::new(renderer, backend, config)?;
/// ```
#[derive(Clone)]
pub struct FirecrawlRenderer {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Action {
    Click { selector: String },
    Wait { milliseconds: u64 },
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(rename = "rawHtml")]
    raw_html: Option<String>,
    markdown: Option<String>,
}

impl FirecrawlRenderer {
    /// Create a renderer with the given API key.
    pub fn new(api_key: impl Into<SecretString>) -> RenderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RenderError::navigation(FIRECRAWL_API_URL, e))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
        })
    }

    /// Create from `FIRECRAWL_API_KEY`.
    pub fn from_env() -> ConfigResult<Self> {
        let key = std::env::var(FIRECRAWL_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                var: FIRECRAWL_KEY_VAR.to_string(),
            })?;
        Self::new(key).map_err(|e| ConfigError::InvalidValue {
            field: "firecrawl".to_string(),
            reason: e.to_string(),
        })
    }

    /// Point at a self-hosted Firecrawl instance.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn scrape(&self, url: &str, actions: &[Action]) -> RenderResult<PageFetchResult> {
        let request = ScrapeRequest {
            url,
            formats: vec!["rawHtml", "markdown"],
            only_main_content: false,
            actions: actions.to_vec(),
        };

        let endpoint = format!("{}/scrape", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(RenderError::Timeout {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RenderError::navigation(
                url,
                format!("Firecrawl API error: {} - {}", status, text),
            ));
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;
        if !body.success {
            let reason = body.error.unwrap_or_else(|| "scrape failed".to_string());
            return Err(RenderError::navigation(url, reason));
        }

        let data = body
            .data
            .ok_or_else(|| RenderError::navigation(url, "no data returned from Firecrawl"))?;
        let raw_html = data.raw_html.unwrap_or_default();
        let markdown = data.markdown.unwrap_or_default();

        Ok(PageFetchResult::new(url, raw_html, markdown))
    }
}

#[async_trait]
impl Renderer for FirecrawlRenderer {
    async fn open_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        if !options.headless {
            debug!("Firecrawl renders remotely; ignoring headed option");
        }
        Ok(Box::new(FirecrawlSession {
            renderer: self.clone(),
            content_selector: options.content_selector.clone(),
            url: None,
            actions: Vec::new(),
            region: None,
        }))
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

struct FirecrawlSession {
    renderer: FirecrawlRenderer,
    content_selector: String,
    url: Option<String>,
    actions: Vec<Action>,
    region: Option<String>,
}

#[async_trait]
impl RenderSession for FirecrawlSession {
    async fn fetch(&mut self, url: &str) -> RenderResult<PageFetchResult> {
        let page = self.renderer.scrape(url, &[]).await?;
        self.url = Some(url.to_string());
        self.actions.clear();
        self.region = Some(region_fingerprint(&page.raw_html, &self.content_selector));
        Ok(page)
    }

    async fn click_and_wait(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> RenderResult<ClickOutcome> {
        let url = self.url.clone().ok_or(RenderError::NoPage)?;

        let actions = with_click(&self.actions, selector, timeout);

        debug!(url = %url, selector = %selector, clicks = actions.len() / 2, "Replaying clicks");
        let page = self.renderer.scrape(&url, &actions).await?;

        let region = region_fingerprint(&page.raw_html, &self.content_selector);
        let changed = self.region.as_deref() != Some(region.as_str());
        if changed {
            self.actions = actions;
            self.region = Some(region);
        }

        Ok(ClickOutcome { page, changed })
    }
}

/// Prior actions followed by a click and a wait for the full timeout.
fn with_click(previous: &[Action], selector: &str, timeout: Duration) -> Vec<Action> {
    let mut actions = previous.to_vec();
    actions.push(Action::Click {
        selector: selector.to_string(),
    });
    actions.push(Action::Wait {
        milliseconds: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    });
    actions
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_serialize_in_firecrawl_shape() {
        let actions = vec![
            Action::Click {
                selector: "li.next > a".to_string(),
            },
            Action::Wait { milliseconds: 1500 },
        ];
        let json = serde_json::to_value(&actions).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "click", "selector": "li.next > a"},
                {"type": "wait", "milliseconds": 1500}
            ])
        );
    }

    #[test]
    fn test_click_waits_for_the_configured_timeout() {
        let first = with_click(&[], "li.next > a", Duration::from_millis(5000));
        let second = with_click(&first, "li.next > a", Duration::from_millis(5000));

        assert_eq!(second.len(), 4);
        let json = serde_json::to_value(&second).unwrap();
        assert_eq!(json[1], serde_json::json!({"type": "wait", "milliseconds": 5000}));
        assert_eq!(json[3], serde_json::json!({"type": "wait", "milliseconds": 5000}));
    }

    #[test]
    fn test_request_omits_empty_actions() {
        let request = ScrapeRequest {
            url: "https://s.org/staff",
            formats: vec!["rawHtml", "markdown"],
            only_main_content: false,
            actions: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("actions").is_none());
        assert_eq!(json["formats"][0], "rawHtml");
    }

    #[tokio::test]
    async fn test_click_before_fetch_is_an_error() {
        let renderer = FirecrawlRenderer::new("fc-test").unwrap();
        let mut session = renderer
            .open_session(&SessionOptions::default())
            .await
            .unwrap();
        let err = session
            .click_and_wait("a.next", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NoPage));
    }
}
