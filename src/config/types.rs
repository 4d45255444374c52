//! Core configuration types for the research engine
//!
//! This module contains the main `Config` struct and its associated types
//! that define every tunable of the research pipeline (§6.1 of the design
//! document): cache policy, rate limiting, per-engine search settings, and
//! the LLM client backend.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for a single search-engine adapter (Brave, Tavily, DuckDuckGo-like).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub(crate) enabled: bool,
    pub(crate) api_key: Option<String>,
    pub(crate) max_results: usize,
    pub(crate) timeout_secs: u64,
    pub(crate) retry_count: u32,
}

impl EngineConfig {
    /// Construct an engine config directly, bypassing `Config::builder()`'s
    /// environment seeding. Useful for tests and for callers wiring up a
    /// `Config` entirely in code.
    #[must_use]
    pub fn new(enabled: bool, api_key: Option<String>, max_results: usize, timeout_secs: u64, retry_count: u32) -> Self {
        Self {
            enabled,
            api_key,
            max_results,
            timeout_secs,
            retry_count,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

/// Settings for the LLM backend consumed via `complete(prompt) -> text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub(crate) base_url: String,
    pub(crate) model_name: String,
    pub(crate) timeout_secs: u64,
    pub(crate) temperature: f32,
    pub(crate) top_p: f32,
}

impl LlmConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    #[must_use]
    pub fn top_p(&self) -> f32 {
        self.top_p
    }
}

/// Immutable configuration for the research engine, built once at process
/// start and passed by reference into every component (§1.1, §9).
///
/// **INVARIANT:** `cache_dir` is always an absolute path (normalized in the
/// builder), mirroring the storage-directory invariant the builder pattern
/// is grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub(crate) cache_dir: PathBuf,
    pub(crate) cache_ttl_seconds: u64,
    pub(crate) cache_max_entries: usize,
    pub(crate) rate_limit_interval_secs: f64,
    pub(crate) user_agent: String,
    pub(crate) max_concurrent_scrapes: usize,
    pub(crate) max_content_size_bytes: usize,
    pub(crate) http_timeout_secs: u64,
    pub(crate) robots_timeout_secs: u64,
    pub(crate) brave: EngineConfig,
    pub(crate) tavily: EngineConfig,
    pub(crate) duckduckgo: EngineConfig,
    pub(crate) llm: LlmConfig,
}
