mod controller;
mod document;
mod error;
mod outcome;

pub use controller::RevisionLoop;
pub use document::{DocumentError, DocumentState};
pub use error::PipelineError;
pub use outcome::{RunReport, RunStatus};
