use draftloops_agent::ResponseSchema;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevisionParseError {
    #[error("failed to parse revision JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("revision carried no content")]
    EmptyRevision,
}

/// The editor's output for one revision pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionResult {
    /// The improved draft, replacing the previous content wholesale
    pub content: String,
    /// What the editor changed, for the judge and the audit trail
    pub revision_notes: Vec<String>,
    /// Version the revised document will carry
    pub version: u32,
}

impl RevisionResult {
    /// Schema the model's reply must conform to.
    pub fn response_schema() -> ResponseSchema {
        ResponseSchema {
            name: "editor_revision",
            schema: json!({
                "type": "object",
                "properties": {
                    "improved_content": {
                        "type": "string",
                        "description": "The improved version of the document"
                    },
                    "revision_notes": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of key improvements and changes made"
                    }
                },
                "required": ["improved_content", "revision_notes"],
                "additionalProperties": false
            }),
        }
    }

    /// Parse the model's JSON reply into a result at `version`.
    ///
    /// A reply whose improved content is blank is rejected; the loop must
    /// never replace a draft with nothing.
    pub fn parse(raw: &str, version: u32) -> Result<Self, RevisionParseError> {
        let payload: RevisionPayload = serde_json::from_str(raw.trim())?;
        if payload.improved_content.trim().is_empty() {
            return Err(RevisionParseError::EmptyRevision);
        }

        Ok(Self {
            content: payload.improved_content,
            revision_notes: payload.revision_notes,
            version,
        })
    }
}

// Wire shape of the model's structured reply.
#[derive(Debug, Deserialize)]
struct RevisionPayload {
    improved_content: String,
    #[serde(default)]
    revision_notes: Vec<String>,
}
