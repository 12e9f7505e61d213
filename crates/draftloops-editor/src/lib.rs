mod agent;
mod prompts;
mod revision;

pub use agent::{EditorAgent, RevisionError, RevisionInput};
pub use prompts::EditorPrompts;
pub use revision::{RevisionParseError, RevisionResult};
