//! Domain types for staff extraction.

pub mod config;
pub mod page;
pub mod record;
pub mod report;
pub mod schema;
