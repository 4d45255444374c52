//! Accessor methods for `Config`.

use std::path::{Path, PathBuf};

use super::types::Config;

impl Config {
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[must_use]
    pub fn query_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("query")
    }

    #[must_use]
    pub fn page_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("page")
    }

    #[must_use]
    pub fn summary_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("summary")
    }

    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.cache_dir.join("sessions")
    }

    #[must_use]
    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache_ttl_seconds
    }

    #[must_use]
    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries
    }

    #[must_use]
    pub fn rate_limit_interval_secs(&self) -> f64 {
        self.rate_limit_interval_secs
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn max_concurrent_scrapes(&self) -> usize {
        self.max_concurrent_scrapes
    }

    #[must_use]
    pub fn max_content_size_bytes(&self) -> usize {
        self.max_content_size_bytes
    }

    #[must_use]
    pub fn http_timeout_secs(&self) -> u64 {
        self.http_timeout_secs
    }

    #[must_use]
    pub fn robots_timeout_secs(&self) -> u64 {
        self.robots_timeout_secs
    }

    #[must_use]
    pub fn brave(&self) -> &super::types::EngineConfig {
        &self.brave
    }

    #[must_use]
    pub fn tavily(&self) -> &super::types::EngineConfig {
        &self.tavily
    }

    #[must_use]
    pub fn duckduckgo(&self) -> &super::types::EngineConfig {
        &self.duckduckgo
    }

    #[must_use]
    pub fn llm(&self) -> &super::types::LlmConfig {
        &self.llm
    }
}
