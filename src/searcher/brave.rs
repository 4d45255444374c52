//! Brave Search API adapter.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::model::Hit;
use crate::utils::is_valid_url;

use super::engine::{SearchEngine, retry_with_backoff};

const ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    url: String,
    title: String,
    #[serde(default)]
    description: String,
}

pub struct BraveSearchEngine {
    client: reqwest::Client,
    config: EngineConfig,
}

impl BraveSearchEngine {
    #[must_use]
    pub fn new(client: reqwest::Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Hit>, String> {
        let Some(api_key) = self.config.api_key() else {
            return Err("no API key configured".to_string());
        };

        let response = self
            .client
            .get(ENDPOINT)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[
                ("q", query),
                ("count", &self.config.max_results().to_string()),
            ])
            .timeout(Duration::from_secs(self.config.timeout_secs()))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("brave returned status {}", response.status()));
        }

        let body: BraveResponse = response.json().await.map_err(|e| e.to_string())?;

        Ok(body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .filter(|r| is_valid_url(&r.url))
            .map(|r| Hit {
                url: r.url,
                title: r.title,
                snippet: r.description,
                engine: "brave".to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl SearchEngine for BraveSearchEngine {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str) -> Vec<Hit> {
        match retry_with_backoff(self.config.retry_count().max(1), || self.fetch(query)).await {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("brave search failed after retries: {err}");
                Vec::new()
            }
        }
    }
}
