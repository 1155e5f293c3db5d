//! Renderer implementations.
//!
//! # Available Renderers
//!
//! - `HttpRenderer` - Plain HTTP, server-rendered pages only
//! - `FirecrawlRenderer` - Firecrawl API with JavaScript and click replay
//!   (requires `firecrawl` feature)
//! - `MockRenderer` - For testing

mod http;
mod mock;

#[cfg(feature = "firecrawl")]
mod firecrawl;

pub use http::HttpRenderer;
pub use mock::{MockCall, MockFailure, MockRenderer};

#[cfg(feature = "firecrawl")]
pub use firecrawl::{FirecrawlRenderer, FIRECRAWL_KEY_VAR};

pub use crate::traits::renderer::{RenderSession, Renderer, SessionOptions};
