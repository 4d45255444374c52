//! Tavily Search API adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::model::Hit;
use crate::utils::is_valid_url;

use super::engine::{SearchEngine, retry_with_backoff};

const ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    title: String,
    #[serde(default)]
    content: String,
}

pub struct TavilySearchEngine {
    client: reqwest::Client,
    config: EngineConfig,
}

impl TavilySearchEngine {
    #[must_use]
    pub fn new(client: reqwest::Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Hit>, String> {
        let Some(api_key) = self.config.api_key() else {
            return Err("no API key configured".to_string());
        };

        let request = TavilyRequest {
            api_key,
            query,
            max_results: self.config.max_results(),
        };

        let response = self
            .client
            .post(ENDPOINT)
            .json(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs()))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("tavily returned status {}", response.status()));
        }

        let body: TavilyResponse = response.json().await.map_err(|e| e.to_string())?;

        Ok(body
            .results
            .into_iter()
            .filter(|r| is_valid_url(&r.url))
            .map(|r| Hit {
                url: r.url,
                title: r.title,
                snippet: r.content,
                engine: "tavily".to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl SearchEngine for TavilySearchEngine {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Vec<Hit> {
        match retry_with_backoff(self.config.retry_count().max(1), || self.fetch(query)).await {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("tavily search failed after retries: {err}");
                Vec::new()
            }
        }
    }
}
