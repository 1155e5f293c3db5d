//! Configuration types for crawling, pagination and model extraction.
//!
//! All configuration is plain data: built once (from defaults, environment
//! or CLI flags), validated, and then passed by reference into the crawler.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::controls::parse_next_controls;

/// Default next-control candidates, tried in order.
///
/// Entries are CSS selectors, except `a:has-text('...')` which matches an
/// anchor or button by its visible label.
pub const DEFAULT_NEXT_BUTTON_SELECTOR: &str = "[aria-label='Next Page'], li.next a, \
    a:has-text('Next'), a:has-text('next'), a:has-text('Siguiente'), a.next, .next a, \
    [rel='next'], a[aria-label*='next'], a[aria-label*='Next'], \
    .pagination a:last-child, .cms-pagination a:last-child";

/// Default provider in `vendor/model` form.
pub const DEFAULT_PROVIDER: &str = "openai/gpt-4o-mini";

/// How the classifier resolves equal nonzero email counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Rendered text already exposes the emails: use the model path
    #[default]
    PreferVisible,
    /// Prefer pattern extraction whenever the markup carries emails
    PreferEmbedded,
}

impl std::str::FromStr for TiePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "prefer_visible" | "visible" => Ok(Self::PreferVisible),
            "prefer_embedded" | "embedded" => Ok(Self::PreferEmbedded),
            other => Err(ConfigError::InvalidValue {
                field: "tie_policy".to_string(),
                reason: format!("unknown policy `{}`", other),
            }),
        }
    }
}

/// Pagination traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Hard cap on pages fetched per URL. Default: 10.
    pub max_pages: usize,

    /// Comma-separated next-control candidates, tried in order.
    pub next_button_selector: String,

    /// How long to wait for content to change after a click. Default: 5000.
    pub wait_timeout_ms: u64,

    /// Region watched for change after a click. Default: whole document.
    pub content_selector: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            next_button_selector: DEFAULT_NEXT_BUTTON_SELECTOR.to_string(),
            wait_timeout_ms: 5000,
            content_selector: "body".to_string(),
        }
    }
}

impl PaginationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cap.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Override the next-control candidates.
    pub fn with_next_button_selector(mut self, selector: impl Into<String>) -> Self {
        self.next_button_selector = selector.into();
        self
    }

    /// Set the post-click wait timeout.
    pub fn with_wait_timeout_ms(mut self, ms: u64) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    /// Set the region watched for change.
    pub fn with_content_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = selector.into();
        self
    }

    /// Check bounds and selector syntax.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pages".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        parse_next_controls(&self.next_button_selector)?;
        scraper::Selector::parse(&self.content_selector).map_err(|e| {
            ConfigError::InvalidSelector {
                selector: self.content_selector.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}

/// Chunking settings for model extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk. Default: 6000 (about 1500 tokens).
    pub chunk_chars: usize,

    /// Fraction of a chunk repeated at the start of the next one.
    /// Default: 0.1.
    pub overlap_rate: f32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 6000,
            overlap_rate: 0.1,
        }
    }
}

impl ChunkConfig {
    /// Overlap expressed in characters.
    pub fn overlap_chars(&self) -> usize {
        (self.chunk_chars as f32 * self.overlap_rate) as usize
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_chars < 100 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_chars".to_string(),
                reason: "must be at least 100".to_string(),
            });
        }
        if !(0.0..0.5).contains(&self.overlap_rate) {
            return Err(ConfigError::InvalidValue {
                field: "overlap_rate".to_string(),
                reason: "must be in [0.0, 0.5)".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level crawler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub pagination: PaginationConfig,

    pub chunking: ChunkConfig,

    /// Model identifier in `vendor/model` form.
    pub provider: String,

    /// Tie-breaking rule for the content classifier.
    pub tie_policy: TiePolicy,

    /// When an embedded page yields no pattern records, try the model.
    ///
    /// Default: false (only visible pages trigger inference).
    pub fallback_to_model: bool,

    /// Maximum URLs traversed at once by `extract_many`. Default: 4.
    pub concurrency: usize,

    /// Overall per-URL timeout. Default: none.
    pub url_timeout_ms: Option<u64>,

    /// Render without a visible browser window. Default: true.
    pub headless: bool,

    /// Diagnostic logging. Default: false.
    pub verbose: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            chunking: ChunkConfig::default(),
            provider: DEFAULT_PROVIDER.to_string(),
            tie_policy: TiePolicy::default(),
            fallback_to_model: false,
            concurrency: 4,
            url_timeout_ms: None,
            headless: true,
            verbose: false,
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from `STAFF_*` environment variables.
    ///
    /// Does not load `.env`; the binary does that before calling this.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("STAFF_MAX_PAGES") {
            config.pagination.max_pages = parse_number("STAFF_MAX_PAGES", &v)?;
        }
        if let Some(v) = lookup("STAFF_NEXT_BUTTON_SELECTOR") {
            config.pagination.next_button_selector = v;
        }
        if let Some(v) = lookup("STAFF_WAIT_TIMEOUT_MS") {
            config.pagination.wait_timeout_ms = parse_number("STAFF_WAIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("STAFF_CONTENT_SELECTOR") {
            config.pagination.content_selector = v;
        }
        if let Some(v) = lookup("STAFF_PROVIDER") {
            config.provider = v;
        }
        if let Some(v) = lookup("STAFF_TIE_POLICY") {
            config.tie_policy = v.parse()?;
        }
        if let Some(v) = lookup("STAFF_FALLBACK_TO_MODEL") {
            config.fallback_to_model = parse_bool("STAFF_FALLBACK_TO_MODEL", &v)?;
        }
        if let Some(v) = lookup("STAFF_CONCURRENCY") {
            config.concurrency = parse_number("STAFF_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("STAFF_URL_TIMEOUT_MS") {
            config.url_timeout_ms = Some(parse_number("STAFF_URL_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("STAFF_CHUNK_CHARS") {
            config.chunking.chunk_chars = parse_number("STAFF_CHUNK_CHARS", &v)?;
        }
        if let Some(v) = lookup("STAFF_CHUNK_OVERLAP") {
            config.chunking.overlap_rate = parse_number("STAFF_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("STAFF_HEADLESS") {
            config.headless = parse_bool("STAFF_HEADLESS", &v)?;
        }
        if let Some(v) = lookup("STAFF_VERBOSE") {
            config.verbose = parse_bool("STAFF_VERBOSE", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set pagination settings.
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set chunking settings.
    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the provider identifier.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the classifier tie policy.
    pub fn with_tie_policy(mut self, policy: TiePolicy) -> Self {
        self.tie_policy = policy;
        self
    }

    /// Enable model fallback for embedded pages without pattern matches.
    pub fn with_fallback_to_model(mut self, enabled: bool) -> Self {
        self.fallback_to_model = enabled;
        self
    }

    /// Set the multi-URL concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-URL timeout.
    pub fn with_url_timeout_ms(mut self, ms: u64) -> Self {
        self.url_timeout_ms = Some(ms);
        self
    }

    /// Set headless rendering.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set verbose diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.pagination.validate()?;
        self.chunking.validate()?;
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.provider.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "provider".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("`{}` is not a valid number", value),
    })
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("`{}` is not a boolean", value),
        }),
    }
}
