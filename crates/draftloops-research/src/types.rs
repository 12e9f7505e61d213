use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How thoroughly the upstream search crawls each hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Snippet-level extraction, cheaper and faster.
    Basic,
    /// Full-page extraction, better raw bodies for synthesis.
    Advanced,
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchDepth::Basic => write!(f, "basic"),
            SearchDepth::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(SearchDepth::Basic),
            "advanced" => Ok(SearchDepth::Advanced),
            _ => Err(format!(
                "Unknown search depth: {s}. Valid options: basic, advanced"
            )),
        }
    }
}

/// One hit as the search provider reports it, before any validation.
///
/// Every field is optional; providers routinely omit raw bodies, scores,
/// and publication dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub published_date: Option<String>,
}

/// A validated research source that survived collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    /// Dedup key: each URL appears at most once per collection pass.
    pub url: String,
    /// Short summary text from the provider.
    pub body: String,
    /// Full page text when the provider extracted one.
    pub raw_body: Option<String>,
    pub relevance_score: f64,
    /// Publication timestamp exactly as the provider reported it.
    pub published_at: Option<String>,
}

impl SourceRecord {
    /// The best text available for synthesis: the full page body when it
    /// has any content, otherwise the summary.
    pub fn effective_content(&self) -> &str {
        match &self.raw_body {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => &self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_depth_round_trips_from_str() {
        assert_eq!("basic".parse::<SearchDepth>().unwrap(), SearchDepth::Basic);
        assert_eq!(
            "ADVANCED".parse::<SearchDepth>().unwrap(),
            SearchDepth::Advanced
        );
        assert!("deep".parse::<SearchDepth>().is_err());
    }

    #[test]
    fn test_effective_content_prefers_raw_body() {
        let record = SourceRecord {
            title: "Title".to_string(),
            url: "https://example.com".to_string(),
            body: "summary".to_string(),
            raw_body: Some("full page".to_string()),
            relevance_score: 0.9,
            published_at: None,
        };
        assert_eq!(record.effective_content(), "full page");
    }

    #[test]
    fn test_effective_content_falls_back_on_blank_raw_body() {
        let record = SourceRecord {
            title: "Title".to_string(),
            url: "https://example.com".to_string(),
            body: "summary".to_string(),
            raw_body: Some("   ".to_string()),
            relevance_score: 0.9,
            published_at: None,
        };
        assert_eq!(record.effective_content(), "summary");
    }
}
