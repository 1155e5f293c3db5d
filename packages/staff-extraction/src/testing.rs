//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the staff extraction
//! library without making real model or network calls. See also
//! [`MockRenderer`](crate::renderers::MockRenderer).

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};
use crate::traits::model::{InferenceRequest, ModelBackend};
use crate::types::record::StaffRecord;

type ChunkParser = dyn Fn(&str) -> Vec<StaffRecord> + Send + Sync;

/// Failure the mock model should return.
#[derive(Debug, Clone)]
pub enum MockInferenceFailure {
    Timeout,
    RateLimited,
    Malformed,
}

impl MockInferenceFailure {
    fn to_error(&self) -> InferenceError {
        match self {
            Self::Timeout => InferenceError::Timeout,
            Self::RateLimited => InferenceError::RateLimited("mock rate limit".to_string()),
            Self::Malformed => InferenceError::Malformed("mock malformed response".to_string()),
        }
    }
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub text_chunk: String,
    pub temperature: f32,
    pub schema_name: String,
}

/// A mock model backend for testing.
///
/// Answers are chosen by substring: the first canned response whose key
/// occurs in the chunk wins. Without a match, the optional parser runs; with
/// no parser, the answer is empty.
#[derive(Default, Clone)]
pub struct MockModel {
    /// Canned answers keyed by chunk substring
    responses: Arc<RwLock<Vec<(String, Vec<StaffRecord>)>>>,

    /// Injected failures keyed by chunk substring
    failures: Arc<RwLock<Vec<(String, MockInferenceFailure)>>>,

    parser: Option<Arc<ChunkParser>>,

    latency: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model that reads `Name | Role | email` lines from each chunk.
    ///
    /// Missing or empty columns become absent fields.
    pub fn line_parser() -> Self {
        Self::new().with_parser(|chunk| {
            chunk
                .lines()
                .filter(|line| line.contains(" | "))
                .filter_map(|line| {
                    let mut cols = line.split(" | ").map(str::trim);
                    let name = cols.next()?;
                    let role = cols.next().filter(|r| !r.is_empty());
                    let email = cols.next().filter(|e| !e.is_empty());
                    StaffRecord::new(name, role, email)
                })
                .collect()
        })
    }

    /// Answer chunks containing `needle` with `records`.
    pub fn with_response(self, needle: impl Into<String>, records: Vec<StaffRecord>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((needle.into(), records));
        self
    }

    /// Fail chunks containing `needle`.
    pub fn with_failure(self, needle: impl Into<String>, failure: MockInferenceFailure) -> Self {
        self.failures
            .write()
            .unwrap()
            .push((needle.into(), failure));
        self
    }

    /// Parse unmatched chunks with a closure.
    pub fn with_parser(
        mut self,
        parser: impl Fn(&str) -> Vec<StaffRecord> + Send + Sync + 'static,
    ) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn answer(&self, chunk: &str) -> InferenceResult<Vec<StaffRecord>> {
        if let Some((_, failure)) = self
            .failures
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| chunk.contains(needle.as_str()))
        {
            return Err(failure.to_error());
        }

        if let Some((_, records)) = self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| chunk.contains(needle.as_str()))
        {
            return Ok(records.clone());
        }

        Ok(self
            .parser
            .as_ref()
            .map(|parse| parse(chunk))
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModelBackend for MockModel {
    async fn infer(&self, request: InferenceRequest) -> InferenceResult<Vec<StaffRecord>> {
        self.calls.write().unwrap().push(MockModelCall {
            text_chunk: request.text_chunk.clone(),
            temperature: request.temperature,
            schema_name: request.schema.name.clone(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.answer(&request.text_chunk)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::RecordSchema;

    fn request(text: &str) -> InferenceRequest {
        InferenceRequest::new("extract", text, RecordSchema::staff_directory())
    }

    #[tokio::test]
    async fn test_canned_response_by_substring() {
        let ann = StaffRecord::new("Ann Lee", Some("Principal"), None::<&str>).unwrap();
        let model = MockModel::new().with_response("Ann", vec![ann.clone()]);

        assert_eq!(model.infer(request("Staff: Ann Lee")).await.unwrap(), vec![ann]);
        assert!(model.infer(request("Nobody here")).await.unwrap().is_empty());
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.calls()[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let model = MockModel::line_parser().with_failure("BOOM", MockInferenceFailure::RateLimited);
        let err = model.infer(request("BOOM")).await.unwrap_err();
        assert!(matches!(err, InferenceError::RateLimited(_)));
    }

    #[test]
    fn test_clear_calls() {
        let model = MockModel::new();
        tokio_test::block_on(model.infer(request("Ann Lee"))).unwrap();
        assert_eq!(model.call_count(), 1);

        model.clear_calls();
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_line_parser() {
        let model = MockModel::line_parser();
        let records = model
            .infer(request(
                "# Staff\nAnn Lee | Principal | ann@x.org\nBob Ray |  | \nnot a row",
            ))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].email.as_deref(), Some("ann@x.org"));
        assert_eq!(records[1].role, None);
        assert_eq!(records[1].email, None);
    }
}
