use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CompletionError, CompletionOutput, CompletionProvider, CompletionRequest};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OpenAI chat-completions provider with strict JSON-schema output.
pub struct OpenAiCompletions {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletions {
    pub fn new(api_key: String) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutput, CompletionError> {
        let started = Instant::now();

        let wire = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.schema.name,
                    strict: true,
                    schema: &request.schema.schema,
                },
            },
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(
            model = %self.model,
            schema = request.schema.name,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&wire)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::Empty)?;

        if let Some(refusal) = choice.message.refusal {
            if !refusal.is_empty() {
                return Err(CompletionError::Refused(refusal));
            }
        }

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CompletionError::Empty);
        }

        debug!(
            model = %reply.model,
            content_len = content.len(),
            "Received completion response"
        );

        Ok(CompletionOutput {
            content,
            model: reply.model,
            duration: started.elapsed(),
        })
    }
}

// Request-side wire types.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

// Response-side wire types.

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
