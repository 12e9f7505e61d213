use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::provider::{CollectionError, SearchProvider};
use crate::types::{SearchDepth, SourceRecord};

const DEFAULT_TOP_RESULTS: usize = 5;

/// Turns a topic into a deduplicated, validated, ranked set of sources.
pub struct ResearchCollector {
    provider: Arc<dyn SearchProvider>,
    depth: SearchDepth,
    top_results: usize,
}

impl ResearchCollector {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            depth: SearchDepth::Advanced,
            top_results: DEFAULT_TOP_RESULTS,
        }
    }

    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }

    /// How many ranked records a collection pass keeps.
    pub fn with_top_results(mut self, top_results: usize) -> Self {
        self.top_results = top_results.max(1);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Collect usable source records for a topic.
    ///
    /// Hits without a URL or without any text are discarded, duplicate URLs
    /// keep their first occurrence, and survivors are ranked by relevance
    /// then capped to the configured budget.
    pub async fn collect(&self, topic: &str) -> Result<Vec<SourceRecord>, CollectionError> {
        let raw = self.provider.search(topic, self.depth).await?;
        let total = raw.len();

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut records: Vec<SourceRecord> = Vec::new();

        for hit in raw {
            let url = match hit.url {
                Some(u) if !u.trim().is_empty() => u,
                _ => continue,
            };
            if seen_urls.contains(&url) {
                continue;
            }

            let raw_body = hit
                .raw_content
                .map(|text| clean_text(&text))
                .filter(|text| !text.is_empty());
            let body = hit.content.map(|text| clean_text(&text)).unwrap_or_default();
            if raw_body.is_none() && body.is_empty() {
                continue;
            }

            seen_urls.insert(url.clone());
            records.push(SourceRecord {
                title: hit.title.unwrap_or_else(|| "Untitled".to_string()),
                url,
                body,
                raw_body,
                relevance_score: hit.score.unwrap_or(0.0),
                published_at: hit.published_date,
            });
        }

        if records.is_empty() {
            warn!(topic, total, "Search produced no usable records");
            return Err(CollectionError::NoUsableResults {
                topic: topic.to_string(),
            });
        }

        // Stable sort: ties keep the provider's original order.
        records.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        });
        records.truncate(self.top_results);

        debug!(topic, kept = records.len(), total, "Collection complete");
        Ok(records)
    }
}

/// Undo the escape artifacts scraped text sometimes carries.
fn clean_text(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\n", "\n").trim().to_string()
}
