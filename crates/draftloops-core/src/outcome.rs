use std::time::Duration;

use crate::document::DocumentState;

/// Terminal state of a revision run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The judge signed off on a revision.
    Approved,
    /// The iteration budget ran out without approval.
    Exhausted,
}

/// Everything a caller needs to report on a finished run.
///
/// Both terminal states produce the same shape; `status` is the only
/// distinction, and the final document is available either way.
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub document: DocumentState,
    /// Completed editor/judge cycles.
    pub iterations: usize,
    /// Recommendations from the judge's last ruling.
    pub recommendations: Vec<String>,
    pub duration: Duration,
}

impl RunReport {
    pub fn is_approved(&self) -> bool {
        matches!(self.status, RunStatus::Approved)
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Approved => 0,
            RunStatus::Exhausted => 1,
        }
    }
}
