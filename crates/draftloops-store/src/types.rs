use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_WORKPRODUCT_DIR: &str = "_workproduct";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path:?} has a malformed header: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },
}

/// Pipeline stage a snapshot was taken at.
///
/// The numeric prefixes keep a run's files in chronological order when the
/// directory is sorted by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitialResearch,
    Expansion,
    EditorDraft,
    JudgeReview,
    Final,
}

impl Stage {
    /// Filename prefix for this stage.
    pub fn prefix(&self) -> &'static str {
        match self {
            Stage::InitialResearch => "01",
            Stage::Expansion => "02",
            Stage::EditorDraft => "03",
            Stage::JudgeReview => "04",
            Stage::Final => "final",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::InitialResearch => "initial_research",
            Stage::Expansion => "expansion",
            Stage::EditorDraft => "editor_draft",
            Stage::JudgeReview => "judge_review",
            Stage::Final => "final",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial_research" => Ok(Stage::InitialResearch),
            "expansion" => Ok(Stage::Expansion),
            "editor_draft" => Ok(Stage::EditorDraft),
            "judge_review" => Ok(Stage::JudgeReview),
            "final" => Ok(Stage::Final),
            _ => Err(format!("Unknown stage: {s}")),
        }
    }
}

/// Whether the judge had signed off on the document when it was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approval {
    /// Mid-run snapshot, no ruling yet.
    #[default]
    Pending,
    /// The judge approved this content.
    Approved,
    /// The run ended without approval (iteration budget exhausted).
    Unapproved,
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Approval::Pending => "pending",
            Approval::Approved => "approved",
            Approval::Unapproved => "unapproved",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Approval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Approval::Pending),
            "approved" => Ok(Approval::Approved),
            "unapproved" => Ok(Approval::Unapproved),
            _ => Err(format!("Unknown approval marker: {s}")),
        }
    }
}

/// Everything the store needs to persist one snapshot.
///
/// Borrows from the caller's document so the store never depends on the
/// pipeline's own types.
#[derive(Clone, Copy)]
pub struct SnapshotInput<'a> {
    pub content: &'a str,
    pub topics: &'a [String],
    pub version: u32,
    pub stage: Stage,
    pub approval: Approval,
    pub metadata: &'a BTreeMap<String, String>,
}

/// Header fields of a stored snapshot, readable without the body.
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub version: u32,
    pub stage: Option<Stage>,
    pub topics: Vec<String>,
    pub approval: Approval,
    /// Header entries beyond the dedicated fields (created_at,
    /// last_modified, judge feedback, ...)
    pub metadata: BTreeMap<String, String>,
}

/// A snapshot loaded back from disk.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub path: PathBuf,
    pub meta: SnapshotMeta,
    pub content: String,
}

/// Reduce a topic to a filename-safe slug: drop characters filesystems
/// reject, collapse whitespace to underscores, lowercase.
pub fn topic_slug(topic: &str) -> String {
    let cleaned: String = topic
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
