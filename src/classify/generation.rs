//! Generation service abstraction and its OpenAI-compatible client

use crate::classify::schema::{OutputSchema, SchemaError};
use crate::config::GenerationConfig;
use crate::crawler::Retryable;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation service rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Model refused: {0}")]
    Refused(String),

    #[error("Generation response had no content")]
    EmptyResponse,

    #[error("Generation response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Generation response does not match schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Generation cancelled")]
    Cancelled,
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled => false,
            Self::Rejected { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            _ => true,
        }
    }
}

/// One generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System instructions
    pub system: String,

    /// User prompt
    pub prompt: String,

    /// When set, the response must be a JSON object matching this schema
    pub schema: Option<OutputSchema>,
}

impl GenerationRequest {
    /// A request for a structured JSON response
    pub fn structured(system: String, prompt: String, schema: OutputSchema) -> Self {
        Self {
            system,
            prompt,
            schema: Some(schema),
        }
    }

    /// A request for free text
    pub fn text(system: String, prompt: String) -> Self {
        Self {
            system,
            prompt,
            schema: None,
        }
    }
}

/// External service producing text or structured JSON from a prompt
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Runs the request
    ///
    /// Structured requests return the parsed, schema-checked object. Text
    /// requests return a JSON string.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

/// Generation service backed by `POST {endpoint}/chat/completions`
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiClient {
    /// Creates a new client
    ///
    /// # Returns
    ///
    /// * `Ok(OpenAiClient)` - Successfully built client
    /// * `Err(reqwest::Error)` - Failed to build the underlying HTTP client
    pub fn new(config: &GenerationConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        if let Some(schema) = &request.schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name(),
                    "strict": true,
                    "schema": schema.to_json_schema(),
                },
            });
        }

        body
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(GenerationError::EmptyResponse)?;

        if let Some(refusal) = message.refusal {
            return Err(GenerationError::Refused(refusal));
        }

        let content = message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        match &request.schema {
            Some(schema) => {
                let value: Value = serde_json::from_str(&content)
                    .map_err(|e| GenerationError::InvalidJson(e.to_string()))?;
                schema.check(&value)?;
                Ok(value)
            }
            None => Ok(Value::String(content)),
        }
    }
}
