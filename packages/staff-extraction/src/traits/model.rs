//! Model backend trait for structured record extraction.
//!
//! The backend owns the actual inference call. The model extractor builds
//! the [`InferenceRequest`] (instruction, chunk, schema, temperature) and
//! treats any [`InferenceError`](crate::error::InferenceError) as an empty
//! chunk.

use async_trait::async_trait;

use crate::error::InferenceResult;
use crate::types::{record::StaffRecord, schema::RecordSchema};

/// One inference call: a text chunk and the shape the answer must take.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// System instruction
    pub instruction: String,

    /// The rendered text to extract from
    pub text_chunk: String,

    /// Strict output schema
    pub schema: RecordSchema,

    /// Sampling temperature. The extractor always sends 0.0.
    pub temperature: f32,
}

impl InferenceRequest {
    pub fn new(
        instruction: impl Into<String>,
        text_chunk: impl Into<String>,
        schema: RecordSchema,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            text_chunk: text_chunk.into(),
            schema,
            temperature: 0.0,
        }
    }
}

/// Language-model backend that turns text into staff records.
///
/// Implementations wrap specific providers and must return records that
/// conform to the request schema, or an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one inference call.
    async fn infer(&self, request: InferenceRequest) -> InferenceResult<Vec<StaffRecord>>;

    /// Get the backend name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
