//! OpenAI implementation of the model backend.
//!
//! Sends each chunk through Chat Completions with a strict `json_schema`
//! response format, so the answer is already shaped as
//! `{"staff_members": [...]}`.
//!
//! # Example
//!
//! ```rust,ignore
//! use staff_extraction::ai::OpenAI;
//!
//! let backend = OpenAI::from_env("openai/gpt-4o-mini")?;
//! let crawler = StaffCrawler::new(renderer, backend, config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult, InferenceError, InferenceResult};
use crate::pipeline::visible::parse_model_response;
use crate::security::ModelCredentials;
use crate::traits::model::{InferenceRequest, ModelBackend};
use crate::types::record::StaffRecord;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible structured-output backend.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    credentials: ModelCredentials,
}

#[derive(Serialize)]
struct StructuredRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAI {
    /// Create a backend from resolved credentials.
    pub fn new(credentials: ModelCredentials) -> ConfigResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Create from `OPENAI_API_KEY` for the given `vendor/model` provider.
    pub fn from_env(provider: impl Into<String>) -> ConfigResult<Self> {
        Self::new(ModelCredentials::from_env(provider)?)
    }

    /// Replace the HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Get the model name sent to the API.
    pub fn model(&self) -> &str {
        self.credentials.model()
    }

    fn base_url(&self) -> &str {
        self.credentials.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Structured output with JSON schema (OpenAI's json_schema response_format).
    pub async fn generate_structured(&self, request: &InferenceRequest) -> InferenceResult<String> {
        let body = StructuredRequest {
            model: self.model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.text_chunk,
                },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema.name,
                    strict: true,
                    schema: &request.schema.schema,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .header(
                "Authorization",
                format!("Bearer {}", self.credentials.api_key.expose()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::RateLimited(text));
        }
        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(InferenceError::Timeout);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Http(
                format!("OpenAI structured output error: {} - {}", status, text).into(),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;

        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| InferenceError::Malformed("no choices in response".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(InferenceError::SchemaViolation(format!("model refused: {}", refusal)));
        }
        message
            .content
            .ok_or_else(|| InferenceError::Malformed("empty message content".to_string()))
    }
}

#[async_trait]
impl ModelBackend for OpenAI {
    async fn infer(&self, request: InferenceRequest) -> InferenceResult<Vec<StaffRecord>> {
        debug!(
            model = %self.model(),
            chunk_bytes = request.text_chunk.len(),
            "Structured inference request"
        );
        let content = self.generate_structured(&request).await?;
        parse_model_response(strip_code_fence(&content))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Remove a Markdown code fence some compatible servers wrap JSON in.
fn strip_code_fence(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn map_reqwest_error(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Http(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::RecordSchema;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_request_body_shape() {
        let request = InferenceRequest::new("extract", "Ann Lee", RecordSchema::staff_directory());
        let body = StructuredRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: &request.text_chunk,
            }],
            temperature: request.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema.name,
                    strict: true,
                    schema: &request.schema.schema,
                },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
        assert_eq!(json["response_format"]["json_schema"]["name"], "staff_directory");
    }

    #[test]
    fn test_model_comes_from_provider() {
        let backend = OpenAI::new(ModelCredentials::new("sk-test", "openai/gpt-4o-mini")).unwrap();
        assert_eq!(backend.model(), "gpt-4o-mini");
        assert_eq!(backend.base_url(), OPENAI_API_URL);
    }

    #[test]
    fn test_new_builds_a_client_or_reports_config_error() {
        let built: ConfigResult<OpenAI> = OpenAI::new(ModelCredentials::new("sk-test", "openai/gpt-4o"));
        let backend = built.unwrap();
        assert_eq!(backend.name(), "openai");
    }
}
