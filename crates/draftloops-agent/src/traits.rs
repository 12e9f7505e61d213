use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while calling a completion capability
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model declined to produce a response: {0}")]
    Refused(String),

    #[error("completion response carried no content")]
    Empty,
}

/// A structured prompt bundle for one completion call.
///
/// `system` sets the role, `user` carries the document context, and
/// `schema` constrains the reply to a machine-parseable shape.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub schema: ResponseSchema,
}

/// JSON schema the model's reply must conform to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    /// Identifier sent with the schema (e.g. "editor_revision")
    pub name: &'static str,
    /// The schema body, serialized verbatim into the request
    pub schema: serde_json::Value,
}

/// Raw output of one completion call, before role-specific parsing.
#[derive(Debug, Clone)]
pub struct CompletionOutput {
    /// The model's reply content (a JSON document matching the schema)
    pub content: String,
    /// Model that actually served the request
    pub model: String,
    /// Wall-clock duration of the call
    pub duration: Duration,
}

/// The core abstraction over completion backends.
///
/// Both agent roles (editor and judge) speak to their model through this
/// trait; tests substitute scripted implementations.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name for logs (e.g. "openai")
    fn name(&self) -> &str;

    /// Run one structured completion call
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutput, CompletionError>;
}
