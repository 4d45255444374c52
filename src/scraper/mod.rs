//! Page fetching and content normalization (§4.5).

mod content;
mod metadata;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use reqwest::Client;

use crate::cache::{Cache, cache_key};
use crate::model::ScrapedContent;
use crate::rate_limiter::RateLimiter;
use crate::robots::RobotsPolicy;
use crate::utils::constants::NEUTRAL_REFERER;
use crate::utils::host_of;

const MAX_CONTENT_SIZE_DEFAULT: usize = 5 * 1024 * 1024;
const MIN_WORD_COUNT: usize = 50;
const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["text/html", "application/xhtml+xml", "text/plain"];

/// Fetches and normalizes a single URL into a `ScrapedContent` (§4.5).
pub struct Scraper {
    client: Client,
    rate_limiter: RateLimiter,
    robots: RobotsPolicy,
    page_cache: Cache,
    user_agent: String,
    fetch_timeout: Duration,
    max_content_size: usize,
}

impl Scraper {
    #[must_use]
    pub fn new(
        client: Client,
        rate_limiter: RateLimiter,
        robots: RobotsPolicy,
        page_cache: Cache,
        user_agent: String,
        fetch_timeout: Duration,
        max_content_size: usize,
    ) -> Self {
        Self {
            client,
            rate_limiter,
            robots,
            page_cache,
            user_agent,
            fetch_timeout,
            max_content_size: if max_content_size == 0 {
                MAX_CONTENT_SIZE_DEFAULT
            } else {
                max_content_size
            },
        }
    }

    /// Run the 10-step pipeline of §4.5. Never returns `Err`: fetch
    /// failures produce an `is_valid: false` `ScrapedContent` carrying the
    /// reason in `error`, which is itself cached to avoid retry storms.
    pub async fn fetch(&self, url: &str) -> ScrapedContent {
        let key = cache_key(url, &[]);

        if let Ok(Some(cached)) = self.page_cache.get(&key).await {
            if let Ok(content) = serde_json::from_str::<ScrapedContent>(&cached) {
                return content;
            }
        }

        let result = self.fetch_uncached(url).await;
        self.persist(&key, url, &result).await;
        result
    }

    async fn persist(&self, key: &str, url: &str, content: &ScrapedContent) {
        if let Ok(serialized) = serde_json::to_string(content) {
            if let Err(e) = self
                .page_cache
                .set(key, url, &serialized, HashMap::new(), None)
                .await
            {
                log::warn!("failed to persist page cache entry for {url}: {e}");
            }
        }
    }

    async fn fetch_uncached(&self, url: &str) -> ScrapedContent {
        let invalid = |status_code: u16, reason: String| ScrapedContent {
            url: url.to_string(),
            content: String::new(),
            title: String::new(),
            author: None,
            description: None,
            publication_date: None,
            site_name: site_name_from_url(url),
            access_time: Utc::now(),
            content_type: String::new(),
            word_count: 0,
            content_hash: String::new(),
            status_code,
            is_valid: false,
            error: Some(reason),
        };

        let Some(host) = host_of(url) else {
            return invalid(0, "invalid URL: no host".to_string());
        };

        if !self.robots.is_allowed(url, &self.user_agent).await {
            return invalid(0, "disallowed by robots.txt".to_string());
        }

        if let Err(e) = self.rate_limiter.wait(&host, None).await {
            return invalid(0, format!("rate limiter error: {e}"));
        }

        let response = match tokio::time::timeout(
            self.fetch_timeout,
            self.client
                .get(url)
                .header("User-Agent", self.user_agent.as_str())
                .header("Referer", NEUTRAL_REFERER)
                .send(),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return invalid(0, format!("request failed: {e}")),
            Err(_) => return invalid(0, "request timed out".to_string()),
        };

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return invalid(status_code, format!("non-success status: {status_code}"));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        if !ACCEPTED_CONTENT_TYPES.iter().any(|accepted| content_type == *accepted) {
            return invalid(status_code, format!("unsupported content-type: {content_type}"));
        }

        if let Some(declared_len) = response.content_length() {
            if declared_len as usize > self.max_content_size {
                return invalid(status_code, "content too large: declared size exceeds limit".to_string());
            }
        }

        let body = match self.stream_body_bounded(response).await {
            Ok(body) => body,
            Err(reason) => return invalid(status_code, reason),
        };

        let html = String::from_utf8_lossy(&body).into_owned();
        let page_meta = metadata::extract_metadata(&html);
        let raw_text = content::extract_main_text(&html);
        let sanitized = content::sanitize(&raw_text);

        let word_count = sanitized.split_whitespace().count();
        let content_hash = hex::encode(xxhash_rust::xxh3::xxh3_64(sanitized.as_bytes()).to_be_bytes());
        let is_valid = word_count >= MIN_WORD_COUNT && !sanitized.trim().is_empty();

        ScrapedContent {
            url: url.to_string(),
            content: sanitized,
            title: page_meta.title.unwrap_or_else(|| url.to_string()),
            author: page_meta.author,
            description: page_meta.description,
            publication_date: page_meta.publication_date,
            site_name: site_name_from_url(url),
            access_time: Utc::now(),
            content_type,
            word_count,
            content_hash,
            status_code,
            is_valid,
            error: if is_valid {
                None
            } else {
                Some(format!("content too short: {word_count} words"))
            },
        }
    }

    async fn stream_body_bounded(&self, response: reqwest::Response) -> Result<Vec<u8>, String> {
        let mut stream = response.bytes_stream();
        let mut body = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("error streaming body: {e}"))?;
            body.extend_from_slice(&chunk);
            if body.len() > self.max_content_size {
                return Err("content too large: streamed size exceeds limit".to_string());
            }
        }

        Ok(body)
    }
}

fn site_name_from_url(url: &str) -> String {
    host_of(url)
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_default()
}

/// Cap the number of concurrent in-flight fetches (§4.5: "Max concurrent
/// fetches: 5 (configurable)"), via a shared semaphore the orchestrator
/// acquires a permit from before calling `fetch`.
#[must_use]
pub fn fetch_semaphore(max_concurrent: usize) -> Arc<tokio::sync::Semaphore> {
    Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_name_strips_leading_www() {
        assert_eq!(site_name_from_url("https://www.example.com/page"), "example.com");
        assert_eq!(site_name_from_url("https://example.com/page"), "example.com");
    }
}
