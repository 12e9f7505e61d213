use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{RawSearchResult, SearchDepth};

const TAVILY_BASE_URL: &str = "https://api.tavily.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no usable research results for topic '{topic}'")]
    NoUsableResults { topic: String },
}

/// The research capability: one query in, ranked raw hits out.
///
/// Implementations talk to a real search service; tests swap in scripted
/// providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name used in log events.
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
    ) -> Result<Vec<RawSearchResult>, CollectionError>;
}

/// Search provider backed by the Tavily HTTP API.
pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: u32,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Result<Self, CollectionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: TAVILY_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    /// Override the API endpoint. Used by tests to point at a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Cap on how many hits the provider is asked for per query.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
    ) -> Result<Vec<RawSearchResult>, CollectionError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequestBody {
            query,
            search_depth: depth,
            include_raw_content: true,
            max_results: self.max_results,
        };

        debug!(query, depth = %depth, "Running web search");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: SearchResponseBody = response.json().await?;
        Ok(reply.results)
    }
}

// Wire types for the Tavily search endpoint.

#[derive(Debug, Serialize)]
struct SearchRequestBody<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    include_raw_content: bool,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    results: Vec<RawSearchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_parses_search_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_header("authorization", "Bearer tvly-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "query": "rust async",
                    "results": [
                        {
                            "title": "Async in depth",
                            "url": "https://example.com/async",
                            "content": "A summary.",
                            "raw_content": "The full page.",
                            "score": 0.97,
                            "published_date": "2024-05-01"
                        },
                        {
                            "url": "https://example.com/bare",
                            "content": "No title, no score."
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = TavilySearch::new("tvly-secret".to_string())
            .unwrap()
            .with_base_url(server.url());
        let results = provider
            .search("rust async", SearchDepth::Advanced)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title.as_deref(), Some("Async in depth"));
        assert_eq!(results[0].score, Some(0.97));
        assert_eq!(results[1].title, None);
        assert_eq!(results[1].raw_content, None);
    }

    #[tokio::test]
    async fn test_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let provider = TavilySearch::new("bad-key".to_string())
            .unwrap()
            .with_base_url(server.url());
        let err = provider
            .search("anything", SearchDepth::Basic)
            .await
            .unwrap_err();

        match err {
            CollectionError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_results_field_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"query": "nothing"}).to_string())
            .create_async()
            .await;

        let provider = TavilySearch::new("tvly-secret".to_string())
            .unwrap()
            .with_base_url(server.url());
        let results = provider
            .search("nothing", SearchDepth::Basic)
            .await
            .unwrap();

        assert!(results.is_empty());
    }
}
