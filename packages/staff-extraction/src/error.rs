//! Typed errors for the staff extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so each boundary
//! (renderer, model backend, configuration) has its own error type and the
//! pagination controller can decide which failures are contained.

use thiserror::Error;

/// Top-level errors surfaced to callers of the crawler facade.
///
/// Only [`ExtractionError::Config`] is fatal; everything else is contained at
/// the page or URL level and reported as a diagnostic.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Renderer failed to fetch or interact with a page
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    /// Model backend failed
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// Invalid or missing configuration (fatal at startup)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A next-control click did not advance the content
    #[error("pagination loop detected at page {page} of {url}")]
    PaginationLoopDetected { url: String, page: usize },

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Traversal exceeded the caller's overall timeout
    #[error("timed out after {elapsed_ms}ms: {url}")]
    TimedOut { url: String, elapsed_ms: u64 },

    /// Export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the renderer boundary.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Page did not reach a ready state in time
    #[error("render timeout: {url}")]
    Timeout { url: String },

    /// Network, DNS or HTTP failure
    #[error("navigation error for {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The adapter cannot perform this interaction (e.g. clicks without JS)
    #[error("{renderer} does not support {operation}")]
    Unsupported {
        renderer: String,
        operation: &'static str,
    },

    /// A session operation was attempted before any page was loaded
    #[error("no page loaded in session")]
    NoPage,
}

impl RenderError {
    /// Build a navigation error from any error source.
    pub fn navigation(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Navigation {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// Errors from the model backend boundary.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Backend did not answer in time
    #[error("inference timeout")]
    Timeout,

    /// Backend refused the call because of rate limits
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Response was not valid JSON or had no content
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Response was JSON but did not match the schema
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Transport or API failure
    #[error("backend error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Configuration errors. Fatal: never recovered mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required credential not present in the environment
    #[error("missing credential: {var} is not set")]
    MissingCredential { var: String },

    /// A next-control or content selector could not be parsed
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A numeric or enumerated option had an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for renderer operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Result type alias for model backend operations.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
