use thiserror::Error;

use crate::document::DocumentError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("research error: {0}")]
    Collection(#[from] draftloops_research::CollectionError),

    #[error("editor error: {0}")]
    Revision(#[from] draftloops_editor::RevisionError),

    #[error("judge error: {0}")]
    Critique(#[from] draftloops_judge::CritiqueError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("persistence error: {0}")]
    Persistence(#[from] draftloops_store::PersistenceError),
}

impl PipelineError {
    /// Which pipeline stage produced the error, for failure events.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Collection(_) => "research",
            PipelineError::Revision(_) => "editor",
            PipelineError::Critique(_) => "judge",
            PipelineError::Document(_) => "document",
            PipelineError::Persistence(_) => "store",
        }
    }
}
