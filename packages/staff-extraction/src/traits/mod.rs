//! Core trait abstractions for staff extraction.
//!
//! These traits define the boundaries toward the external collaborators:
//! the rendering engine and the language-model backend.

pub mod model;
pub mod renderer;
