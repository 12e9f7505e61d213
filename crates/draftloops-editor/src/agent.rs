use std::sync::Arc;
use std::time::Duration;

use draftloops_agent::{with_retry, CompletionError, CompletionProvider, CompletionRequest};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompts::EditorPrompts;
use crate::revision::{RevisionParseError, RevisionResult};

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Inputs required for one revision pass.
#[derive(Clone, Copy)]
pub struct RevisionInput<'a> {
    pub content: &'a str,
    pub topics: &'a [String],
    pub version: u32,
}

#[derive(Error, Debug)]
pub enum RevisionError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("failed to parse revision: {0}")]
    Parse(#[from] RevisionParseError),
}

/// The improver role: rewrites the draft for clarity and structure.
pub struct EditorAgent {
    provider: Arc<dyn CompletionProvider>,
    max_retries: u32,
    base_delay: Duration,
}

impl EditorAgent {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }

    /// Override the transient-failure retry budget.
    pub fn with_retry_budget(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Produce an improved draft from the current document state.
    ///
    /// The result always carries `input.version + 1`; the caller applies it
    /// to the document, it is never applied here.
    pub async fn revise(&self, input: RevisionInput<'_>) -> Result<RevisionResult, RevisionError> {
        let request = CompletionRequest {
            system: EditorPrompts::system_prompt(),
            user: EditorPrompts::build_revision_prompt(input.content, input.topics, input.version),
            schema: RevisionResult::response_schema(),
        };

        debug!(
            version = input.version,
            prompt_len = request.user.len(),
            "Running editor revision"
        );

        let output = with_retry(self.max_retries, self.base_delay, || {
            self.provider.complete(&request)
        })
        .await?;

        info!(
            model = %output.model,
            duration_secs = output.duration.as_secs_f64(),
            "Editor completed"
        );

        Ok(RevisionResult::parse(&output.content, input.version + 1)?)
    }
}
