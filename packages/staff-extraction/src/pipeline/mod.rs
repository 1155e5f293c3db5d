//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Content classification (embedded markup vs. visible text)
//! - Pattern extraction over raw HTML
//! - Chunked model extraction over rendered text
//! - Deduplicating aggregation in first-seen order
//! - Pagination detection and traversal (URL parameter or click control)

pub mod aggregate;
pub mod chunk;
pub mod classify;
pub mod controls;
pub mod pagination;
pub mod patterns;
pub mod strategy;
pub mod url_param;
pub mod visible;

pub use aggregate::{merge, Aggregator, MergeSummary};
pub use chunk::{chunk_text, TextChunks};
pub use classify::{analyze, classify, count_distinct_emails, ContentAnalysis, ExtractionMode};
pub use controls::{detect_next_control, parse_next_controls, DetectedControl, NextControl};
pub use pagination::{PaginationController, PaginationState, PaginationStyle};
pub use patterns::{extract_embedded, CaptureMapping, Recognizer, RECOGNIZERS};
pub use strategy::{extract_page, ExtractionStrategy, PageExtraction};
pub use url_param::{detect_url_pagination, UrlPagination, PAGE_PARAMS};
pub use visible::{
    extract_visible, infer_chunks, parse_model_response, ChunkOutcome, VisibleExtraction,
    EXTRACTION_INSTRUCTION,
};
