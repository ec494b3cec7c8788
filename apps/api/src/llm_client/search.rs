//! Web search tool used to enrich company research.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TAVILY_BASE: &str = "https://api.tavily.com";
const MAX_RESULTS: u32 = 5;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Tavily search API client.
#[derive(Clone)]
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TavilySearch {
    pub fn new(api_key: String, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: format!("{}/search", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SearchTool for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                max_results: MAX_RESULTS,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TavilyResponse = response.json().await?;
        Ok(body.results)
    }
}

/// Renders search hits as a compact bullet list for prompt inclusion.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("- {} ({}): {}", h.title, h.url, h.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_posts_query_and_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"query": "Google culture", "max_results": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"title": "Life at Google", "url": "https://careers.google.com", "content": "Innovation first."}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = TavilySearch::new("tvly-key".to_string(), &server.uri());
        let hits = tool.search("Google culture").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Life at Google");
    }

    #[tokio::test]
    async fn test_search_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let tool = TavilySearch::new("nope".to_string(), &server.uri());
        let err = tool.search("anything").await.unwrap_err();
        assert!(matches!(err, SearchError::Api { status: 401, .. }));
    }

    #[test]
    fn test_format_hits_one_line_per_hit() {
        let hits = vec![
            SearchHit {
                title: "A".into(),
                url: "https://a".into(),
                content: " first ".into(),
            },
            SearchHit {
                title: "B".into(),
                url: "https://b".into(),
                content: "second".into(),
            },
        ];
        let text = format_hits(&hits);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("- A (https://a): first"));
    }
}
