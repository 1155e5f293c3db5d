//! Model extractor for contact data that is visible in rendered text.
//!
//! Text is split by [`chunk_text`] and each chunk becomes one
//! [`InferenceRequest`] at temperature 0. A failed chunk contributes no
//! records and one diagnostic; the remaining chunks still count.

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::error::{InferenceError, InferenceResult};
use crate::pipeline::chunk::chunk_text;
use crate::traits::model::{InferenceRequest, ModelBackend};
use crate::types::config::ChunkConfig;
use crate::types::record::StaffRecord;
use crate::types::report::{Diagnostic, DiagnosticKind};
use crate::types::schema::RecordSchema;

/// System instruction sent with every chunk.
pub const EXTRACTION_INSTRUCTION: &str = r#"Extract ALL staff members from this page.

Rules:
1. Only extract real names that actually appear in the content.
2. Never invent, generate or complete any data.
3. If there is no staff data, return {"staff_members": []}.
4. Names usually appear next to email addresses or job titles.

For each person found, extract:
- name: the exact full name as shown (e.g. "Ms. Lauren Rider")
- role: their job title (Teacher, Principal, Secretary, Counselor, ...)
- email: their email if it is visible (mailto: links or plain text)

Common layouts:
- [Name](mailto:email), Role
- Name | Role | email@domain
- Name - Role - email

Do not output placeholder names such as "John Doe" or "Jane Smith"."#;

/// Result of one inference call.
#[derive(Debug)]
pub struct ChunkOutcome {
    /// 0-based chunk index
    pub index: usize,

    pub result: InferenceResult<Vec<StaffRecord>>,
}

/// Records and contained failures from one page of visible text.
#[derive(Debug, Default)]
pub struct VisibleExtraction {
    pub records: Vec<StaffRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub chunks: usize,
}

/// Stream one outcome per chunk, in chunk order.
pub fn infer_chunks<'a, M>(
    backend: &'a M,
    text: &'a str,
    schema: &'a RecordSchema,
    chunking: &'a ChunkConfig,
) -> Pin<Box<dyn Stream<Item = ChunkOutcome> + Send + 'a>>
where
    M: ModelBackend + ?Sized,
{
    Box::pin(stream! {
        for (index, chunk) in chunk_text(text, chunking).enumerate() {
            let request = InferenceRequest::new(EXTRACTION_INSTRUCTION, chunk, schema.clone());
            let result = backend.infer(request).await.map(|records| {
                records
                    .into_iter()
                    .filter_map(StaffRecord::normalized)
                    .collect::<Vec<_>>()
            });
            yield ChunkOutcome { index, result };
        }
    })
}

/// Run the model over every chunk of `text` and concatenate the results.
pub async fn extract_visible<M>(
    backend: &M,
    url: &str,
    text: &str,
    schema: &RecordSchema,
    chunking: &ChunkConfig,
) -> VisibleExtraction
where
    M: ModelBackend + ?Sized,
{
    let mut extraction = VisibleExtraction::default();
    let mut outcomes = infer_chunks(backend, text, schema, chunking);

    while let Some(outcome) = outcomes.next().await {
        extraction.chunks += 1;
        match outcome.result {
            Ok(records) => {
                debug!(url = %url, chunk = outcome.index, found = records.len(), "Chunk extracted");
                extraction.records.extend(records);
            }
            Err(e) => {
                warn!(
                    url = %url,
                    chunk = outcome.index,
                    error = %e,
                    "Inference failed, chunk treated as empty"
                );
                extraction.diagnostics.push(Diagnostic::new(
                    url,
                    DiagnosticKind::Inference,
                    format!("chunk {}: {}", outcome.index + 1, e),
                ));
            }
        }
    }

    extraction
}

/// Parse a backend's JSON answer into normalized records.
///
/// Accepts `{"staff_members": [...]}`, a list of such objects (one per
/// chunk), or a bare list of records. Items that do not fit the record shape
/// are skipped.
pub fn parse_model_response(raw: &str) -> InferenceResult<Vec<StaffRecord>> {
    if raw.trim().is_empty() {
        return Err(InferenceError::Malformed("empty response".to_string()));
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| InferenceError::Malformed(e.to_string()))?;

    let items: Vec<Value> = match value {
        Value::Object(mut map) => match map.remove("staff_members") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(InferenceError::SchemaViolation(
                    "staff_members is not a list".to_string(),
                ))
            }
            None => {
                return Err(InferenceError::SchemaViolation(
                    "missing staff_members".to_string(),
                ))
            }
        },
        Value::Array(items) if items.iter().any(|i| i.get("staff_members").is_some()) => items
            .into_iter()
            .filter_map(|mut i| match i.get_mut("staff_members").map(Value::take) {
                Some(Value::Array(inner)) => Some(inner),
                _ => None,
            })
            .flatten()
            .collect(),
        Value::Array(items) => items,
        other => {
            return Err(InferenceError::SchemaViolation(format!(
                "expected object or list, got {}",
                other
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<StaffRecord>(item).ok())
        .filter_map(StaffRecord::normalized)
        .collect())
}
