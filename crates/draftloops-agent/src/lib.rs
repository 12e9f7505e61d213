mod openai;
mod retry;
mod traits;

pub use openai::OpenAiCompletions;
pub use retry::with_retry;
pub use traits::{
    CompletionError, CompletionOutput, CompletionProvider, CompletionRequest, ResponseSchema,
};
