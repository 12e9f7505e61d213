use std::sync::Arc;
use std::time::Duration;

use draftloops_agent::{with_retry, CompletionError, CompletionProvider, CompletionRequest};
use thiserror::Error;
use tracing::{debug, info};

use crate::decision::{CritiqueParseError, CritiqueResult};
use crate::prompts::JudgePrompts;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Inputs required to critique one revision.
#[derive(Clone, Copy)]
pub struct CritiqueInput<'a> {
    pub original_content: &'a str,
    pub topics: &'a [String],
    pub original_version: u32,
    pub revised_content: &'a str,
    pub revised_version: u32,
    pub revision_notes: &'a [String],
}

#[derive(Error, Debug)]
pub enum CritiqueError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("failed to parse critique: {0}")]
    Parse(#[from] CritiqueParseError),
}

/// The gatekeeper role: rules on whether a revision meets the bar.
pub struct JudgeAgent {
    provider: Arc<dyn CompletionProvider>,
    max_retries: u32,
    base_delay: Duration,
}

impl JudgeAgent {
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

    /// Compare the revision against the draft it replaced and rule on it.
    pub async fn review(&self, input: CritiqueInput<'_>) -> Result<CritiqueResult, CritiqueError> {
        let request = CompletionRequest {
            system: JudgePrompts::system_prompt(),
            user: JudgePrompts::build_review_prompt(
                input.original_content,
                input.topics,
                input.original_version,
                input.revised_content,
                input.revised_version,
                input.revision_notes,
            ),
            schema: CritiqueResult::response_schema(),
        };

        debug!(
            original_version = input.original_version,
            revised_version = input.revised_version,
            prompt_len = request.user.len(),
            "Running judge review"
        );

        let output = with_retry(self.max_retries, self.base_delay, || {
            self.provider.complete(&request)
        })
        .await?;

        let critique = CritiqueResult::parse(&output.content)?;

        info!(
            model = %output.model,
            duration_secs = output.duration.as_secs_f64(),
            verdict = %critique.short_description(),
            "Judge completed"
        );

        Ok(critique)
    }
}
