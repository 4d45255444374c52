//! Multi-engine search aggregation (§4.4).

mod brave;
mod duckduckgo;
mod engine;
mod tavily;

pub use engine::SearchEngine;

use futures::future::join_all;

use crate::config::Config;
use crate::model::Hit;
use crate::utils::normalize_url;

/// Fans search out across all enabled engines and merges the results
/// (§4.4 Aggregation).
pub struct MultiEngineSearcher {
    engines: Vec<Box<dyn SearchEngine>>,
}

impl MultiEngineSearcher {
    /// Build the searcher's engine list from `config`, in declaration order
    /// `[brave, tavily, duckduckgo]` — the tie-break order for
    /// deduplication (§4.4: "first engine listed wins for duplicates").
    #[must_use]
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut engines: Vec<Box<dyn SearchEngine>> = Vec::new();

        if config.brave().enabled() {
            engines.push(Box::new(brave::BraveSearchEngine::new(
                client.clone(),
                config.brave().clone(),
            )));
        }
        if config.tavily().enabled() {
            engines.push(Box::new(tavily::TavilySearchEngine::new(
                client.clone(),
                config.tavily().clone(),
            )));
        }
        if config.duckduckgo().enabled() {
            engines.push(Box::new(duckduckgo::DuckDuckGoSearchEngine::new(
                client.clone(),
                config.duckduckgo().clone(),
            )));
        }

        Self { engines }
    }

    #[must_use]
    pub fn with_engines(engines: Vec<Box<dyn SearchEngine>>) -> Self {
        Self { engines }
    }

    /// Search across every enabled engine concurrently, dedupe by
    /// normalized URL (first-listed engine wins ties), and cap at 10 hits
    /// (§4.4).
    pub async fn search(&self, query: &str) -> Vec<Hit> {
        const MAX_HITS: usize = 10;

        let futures = self.engines.iter().map(|engine| engine.search(query));
        let per_engine_results = join_all(futures).await;

        let mut seen = std::collections::HashSet::new();
        let mut hits = Vec::new();

        for engine_hits in per_engine_results {
            for hit in engine_hits {
                let Some(normalized) = normalize_url(&hit.url) else {
                    continue;
                };
                if seen.insert(normalized) {
                    hits.push(hit);
                    if hits.len() >= MAX_HITS {
                        return hits;
                    }
                }
            }
        }

        hits
    }
}
