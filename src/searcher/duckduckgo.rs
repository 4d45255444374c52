//! DuckDuckGo-like search adapter: the HTML-only `html.duckduckgo.com`
//! endpoint, which needs no API key — the one engine enabled by default
//! with nothing configured (§6.1).

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::EngineConfig;
use crate::model::Hit;
use crate::utils::is_valid_url;

use super::engine::{SearchEngine, retry_with_backoff};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoSearchEngine {
    client: reqwest::Client,
    config: EngineConfig,
}

impl DuckDuckGoSearchEngine {
    #[must_use]
    pub fn new(client: reqwest::Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Hit>, String> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[("q", query)])
            .timeout(Duration::from_secs(self.config.timeout_secs()))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("duckduckgo returned status {}", response.status()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(Self::parse_results(&body, self.config.max_results()))
    }

    fn parse_results(body: &str, max_results: usize) -> Vec<Hit> {
        let document = Html::parse_document(body);
        let result_selector = Selector::parse(".result").expect("static selector is valid");
        let title_selector = Selector::parse(".result__a").expect("static selector is valid");
        let snippet_selector = Selector::parse(".result__snippet").expect("static selector is valid");

        let mut hits = Vec::new();
        for result in document.select(&result_selector) {
            let Some(title_el) = result.select(&title_selector).next() else {
                continue;
            };
            let Some(url) = title_el.value().attr("href") else {
                continue;
            };
            let url = decode_redirect_url(url);
            if !is_valid_url(&url) {
                continue;
            }

            let title = title_el.text().collect::<String>().trim().to_string();
            let snippet = result
                .select(&snippet_selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            hits.push(Hit {
                url,
                title,
                snippet,
                engine: "duckduckgo".to_string(),
            });

            if hits.len() >= max_results {
                break;
            }
        }

        hits
    }
}

/// DuckDuckGo's HTML results wrap links through `//duckduckgo.com/l/?uddg=<encoded>`;
/// unwrap that redirect to the real target URL.
fn decode_redirect_url(href: &str) -> String {
    let Some(query_start) = href.find("uddg=") else {
        return href.to_string();
    };
    let encoded = &href[query_start + "uddg=".len()..];
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string())
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearchEngine {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Vec<Hit> {
        match retry_with_backoff(self.config.retry_count().max(1), || self.fetch(query)).await {
            Ok(hits) => hits,
            Err(err) => {
                log::warn!("duckduckgo search failed after retries: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_uddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(decode_redirect_url(href), "https://example.com/page");
    }

    #[test]
    fn leaves_direct_urls_untouched() {
        let href = "https://example.com/page";
        assert_eq!(decode_redirect_url(href), href);
    }

    #[test]
    fn parses_result_blocks_and_caps_at_max_results() {
        let html = r#"
            <div class="result">
                <a class="result__a" href="https://a.example.com/">A title</a>
                <a class="result__snippet">First snippet</a>
            </div>
            <div class="result">
                <a class="result__a" href="https://b.example.com/">B title</a>
                <a class="result__snippet">Second snippet</a>
            </div>
        "#;
        let hits = DuckDuckGoSearchEngine::parse_results(html, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://a.example.com/");
        assert_eq!(hits[0].title, "A title");
    }
}
