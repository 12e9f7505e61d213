use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use draftloops_editor::RevisionResult;
use draftloops_judge::{CritiqueResult, Verdict};
use draftloops_research::SourceRecord;
use draftloops_store::{Approval, StoredSnapshot};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("no usable research content for topic '{topic}'")]
    EmptyInput { topic: String },

    #[error("revision carries version {actual}, expected {expected}")]
    VersionSkew { expected: u32, actual: u32 },
}

/// The document being researched, drafted, and revised.
///
/// Owned by the loop controller for the duration of a run. `version` starts
/// at 1 and moves by exactly 1 per accepted change; `topics[0]` is the
/// originating topic and is never removed.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub content: String,
    pub topics: Vec<String>,
    pub version: u32,
    /// Timestamps plus the judge's latest feedback, persisted in every
    /// snapshot header.
    pub metadata: BTreeMap<String, String>,
    /// URLs of every source folded into the content.
    pub sources: BTreeSet<String>,
}

impl DocumentState {
    /// Build the initial document from collected research.
    ///
    /// Each record becomes a titled content block followed by its source
    /// attribution. An empty record slice never seeds a document.
    pub fn seed(topic: &str, records: &[SourceRecord]) -> Result<Self, DocumentError> {
        if records.is_empty() {
            return Err(DocumentError::EmptyInput {
                topic: topic.to_string(),
            });
        }

        let now = Utc::now().to_rfc3339();
        let mut metadata = BTreeMap::new();
        metadata.insert("created_at".to_string(), now.clone());
        metadata.insert("last_modified".to_string(), now);

        Ok(Self {
            content: format_blocks(records),
            topics: vec![topic.to_string()],
            version: 1,
            metadata,
            sources: records.iter().map(|r| r.url.clone()).collect(),
        })
    }

    /// Rebuild document state from a stored snapshot.
    ///
    /// Source URLs are not recorded per-block in the snapshot header, so a
    /// resumed document starts with an empty source set; attribution lines
    /// survive inside the content itself.
    pub fn from_snapshot(snapshot: StoredSnapshot) -> Self {
        Self {
            content: snapshot.content,
            topics: snapshot.meta.topics,
            version: snapshot.meta.version,
            metadata: snapshot.meta.metadata,
            sources: BTreeSet::new(),
        }
    }

    /// Append a researched section for an additional topic.
    ///
    /// The new material lands under a `# {topic}` heading, the topic joins
    /// the topic list, and the version moves by 1.
    pub fn append_section(
        &mut self,
        topic: &str,
        records: &[SourceRecord],
    ) -> Result<(), DocumentError> {
        if records.is_empty() {
            return Err(DocumentError::EmptyInput {
                topic: topic.to_string(),
            });
        }

        self.content
            .push_str(&format!("\n\n# {}\n\n{}", topic, format_blocks(records)));
        self.topics.push(topic.to_string());
        self.version += 1;
        for record in records {
            self.sources.insert(record.url.clone());
        }
        self.touch();
        Ok(())
    }

    /// Replace the content with an accepted revision.
    ///
    /// The revision must carry exactly the next version number; anything
    /// else means the revision was produced against a stale document.
    pub fn apply_revision(&mut self, revision: &RevisionResult) -> Result<(), DocumentError> {
        let expected = self.version + 1;
        if revision.version != expected {
            return Err(DocumentError::VersionSkew {
                expected,
                actual: revision.version,
            });
        }

        self.content = revision.content.clone();
        self.version = revision.version;
        self.touch();
        Ok(())
    }

    /// Fold the judge's ruling into the metadata so the review snapshot
    /// carries it durably. Each review replaces the previous entries.
    pub fn record_review(&mut self, critique: &CritiqueResult) {
        let verdict = match critique.verdict {
            Verdict::Approve => "approve",
            Verdict::Revise => "revise",
        };
        self.metadata
            .insert("judge_verdict".to_string(), verdict.to_string());
        self.metadata
            .insert("judge_feedback".to_string(), single_line(&critique.feedback));
        self.metadata.insert(
            "judge_recommendations".to_string(),
            critique
                .recommendations
                .iter()
                .map(|r| single_line(r))
                .collect::<Vec<_>>()
                .join("; "),
        );
        self.touch();
    }

    /// Mirror the terminal approval marker into the metadata.
    pub fn record_approval(&mut self, approval: Approval) {
        self.metadata
            .insert("approval".to_string(), approval.to_string());
        self.touch();
    }

    fn touch(&mut self) {
        self.metadata
            .insert("last_modified".to_string(), Utc::now().to_rfc3339());
    }
}

/// Render research records as titled Markdown blocks with attribution.
fn format_blocks(records: &[SourceRecord]) -> String {
    let blocks: Vec<String> = records
        .iter()
        .map(|record| {
            let attribution = match &record.published_at {
                Some(date) => format!("Source: {} (published {})", record.url, date),
                None => format!("Source: {}", record.url),
            };
            format!(
                "## Content from {}\n\n{}\n\n{}",
                record.title,
                record.effective_content(),
                attribution
            )
        })
        .collect();
    blocks.join("\n\n")
}

// Snapshot headers are line-oriented; model text gets flattened before it
// becomes a metadata value.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
