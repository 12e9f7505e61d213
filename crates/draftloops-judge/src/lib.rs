mod agent;
mod decision;
mod prompts;

pub use agent::{CritiqueError, CritiqueInput, JudgeAgent};
pub use decision::{CritiqueParseError, CritiqueResult, Verdict};
pub use prompts::JudgePrompts;
