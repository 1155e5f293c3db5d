//! Staff Directory Extraction Library
//!
//! Pulls `(name, role, email)` records out of organizational staff
//! directories, including directories spread over several pages.
//!
//! # Design
//!
//! **Patterns first, model when needed**
//!
//! - Each page is classified by comparing emails in the markup with emails
//!   in the rendered text
//! - Markup-embedded data (`mailto:` links, `aria-label`s, inline JSON) is
//!   read with regex recognizers and never reaches the model
//! - Visible text is chunked and sent to a structured-output model backend
//! - Records are deduplicated by email (or name and role) across pages
//! - Pagination is followed by URL parameter or by clicking a next control
//! - Page-level failures become diagnostics; only bad configuration is fatal
//!
//! # Usage
//!
//! ```rust,ignore
//! use staff_extraction::{CrawlerConfig, StaffCrawler};
//! use staff_extraction::renderers::HttpRenderer;
//! use staff_extraction::ai::OpenAI;
//!
//! let config = CrawlerConfig::from_env()?;
//! let backend = OpenAI::from_env(&config.provider)?;
//! let crawler = StaffCrawler::new(HttpRenderer::new()?, backend, config)?;
//!
//! let report = crawler.extract_with_pagination("https://school.org/staff").await;
//! let path = staff_extraction::export::export_csv(&report.records, "results", "staff")?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Boundaries toward the renderer and the model backend
//! - [`types`] - Records, reports, configuration, schema
//! - [`pipeline`] - Classification, extraction, aggregation, pagination
//! - [`renderers`] - Renderer implementations (HTTP, Firecrawl, mock)
//! - [`security`] - Credential handling
//! - [`export`] - CSV output
//! - [`testing`] - Mock model backend for testing

pub mod crawler;
pub mod error;
pub mod export;
pub mod html;
pub mod pipeline;
pub mod renderers;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use crawler::StaffCrawler;
pub use error::{ConfigError, ExtractionError, InferenceError, RenderError, Result};
pub use traits::{
    model::{InferenceRequest, ModelBackend},
    renderer::{RenderSession, Renderer, SessionOptions},
};
pub use types::{
    config::{ChunkConfig, CrawlerConfig, PaginationConfig, TiePolicy},
    page::{ClickOutcome, PageFetchResult},
    record::{IdentityKey, StaffRecord},
    report::{BatchReport, Diagnostic, DiagnosticKind, ExtractionReport},
    schema::{RecordSchema, StaffDirectory},
};

// Re-export pipeline components
pub use pipeline::{
    // Classification
    analyze, classify, ContentAnalysis, ExtractionMode,
    // Extraction
    extract_embedded, extract_page, extract_visible, parse_model_response,
    // Aggregation
    merge, Aggregator,
    // Pagination
    PaginationController, PaginationStyle,
};

// Re-export export helpers
pub use export::{export_csv, write_csv};

// Re-export testing utilities
pub use renderers::MockRenderer;
pub use testing::MockModel;
