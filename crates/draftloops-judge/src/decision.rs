use draftloops_agent::ResponseSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// The judge's ruling on one revision.
///
/// A single tagged value: a critique is either an approval or a revision
/// request, never both and never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The draft meets the bar; the loop stops.
    Approve,
    /// The draft needs another pass; feedback says what to fix.
    Revise,
}

#[derive(Error, Debug)]
pub enum CritiqueParseError {
    #[error("failed to parse critique JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The judge's full assessment of a revision.
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueResult {
    pub verdict: Verdict,
    /// Narrative assessment of the changes
    pub feedback: String,
    /// Concrete fixes for the next pass; usually empty on approval
    pub recommendations: Vec<String>,
}

impl CritiqueResult {
    /// Schema the model's reply must conform to.
    pub fn response_schema() -> ResponseSchema {
        ResponseSchema {
            name: "judge_review",
            schema: json!({
                "type": "object",
                "properties": {
                    "feedback": {
                        "type": "string",
                        "description": "Detailed feedback about the document changes"
                    },
                    "recommendations": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of specific recommendations for improvement"
                    },
                    "decision": {
                        "type": "string",
                        "enum": ["approve", "revise"],
                        "description": "Whether to approve the draft or request another revision"
                    }
                },
                "required": ["feedback", "recommendations", "decision"],
                "additionalProperties": false
            }),
        }
    }

    /// Parse the model's JSON reply.
    pub fn parse(raw: &str) -> Result<Self, CritiqueParseError> {
        debug!(output_len = raw.len(), "Parsing judge critique");
        let payload: CritiquePayload = serde_json::from_str(raw.trim())?;

        Ok(Self {
            verdict: payload.decision,
            feedback: payload.feedback,
            recommendations: payload.recommendations,
        })
    }

    pub fn approved(&self) -> bool {
        self.verdict == Verdict::Approve
    }

    pub fn revision_required(&self) -> bool {
        self.verdict == Verdict::Revise
    }

    /// Short description of the ruling for log lines.
    pub fn short_description(&self) -> String {
        match self.verdict {
            Verdict::Approve => "APPROVE".to_string(),
            Verdict::Revise => {
                if self.recommendations.is_empty() {
                    "REVISE".to_string()
                } else {
                    format!("REVISE ({} recommendations)", self.recommendations.len())
                }
            }
        }
    }
}

// Wire shape of the model's structured reply.
#[derive(Debug, Deserialize)]
struct CritiquePayload {
    feedback: String,
    #[serde(default)]
    recommendations: Vec<String>,
    decision: Verdict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_approval() {
        let raw = r#"{
            "feedback": "The revision reads cleanly and keeps every source claim.",
            "recommendations": [],
            "decision": "approve"
        }"#;

        let critique = CritiqueResult::parse(raw).unwrap();
        assert!(critique.approved());
        assert!(!critique.revision_required());
        assert_eq!(critique.short_description(), "APPROVE");
    }

    #[test]
    fn test_parses_revision_request() {
        let raw = r#"{
            "feedback": "The middle section still repeats itself.",
            "recommendations": ["Merge the two background sections", "Cite the second source"],
            "decision": "revise"
        }"#;

        let critique = CritiqueResult::parse(raw).unwrap();
        assert!(critique.revision_required());
        assert_eq!(critique.recommendations.len(), 2);
        assert_eq!(critique.short_description(), "REVISE (2 recommendations)");
    }

    #[test]
    fn test_missing_recommendations_default_to_empty() {
        let raw = r#"{"feedback": "Fine.", "decision": "approve"}"#;

        let critique = CritiqueResult::parse(raw).unwrap();
        assert!(critique.recommendations.is_empty());
    }

    #[test]
    fn test_unknown_decision_is_rejected() {
        let raw = r#"{"feedback": "Hmm.", "recommendations": [], "decision": "maybe"}"#;

        let err = CritiqueResult::parse(raw).unwrap_err();
        assert!(matches!(err, CritiqueParseError::Json(_)));
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Approve).unwrap(), "\"approve\"");
        assert_eq!(serde_json::to_string(&Verdict::Revise).unwrap(), "\"revise\"");
    }
}
