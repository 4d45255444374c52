//! Type-safe builder for `Config` using the typestate pattern
//!
//! Compile-time validation ensures the cache directory is set before
//! `build()` is callable; engine/API-key consistency (§6.1: an enabled
//! engine with no API key is a configuration error) is checked at `build()`
//! time since it depends on runtime values, not on which setters were called.

use std::env;
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::error::ResearchError;

use super::types::{Config, EngineConfig, LlmConfig};

/// Type state: cache directory not yet provided.
pub struct Incomplete;
/// Type state: all required fields provided, `build()` is callable.
pub struct Complete;

pub struct ConfigBuilder<State = Incomplete> {
    cache_dir: Option<PathBuf>,
    cache_ttl_seconds: u64,
    cache_max_entries: usize,
    rate_limit_interval_secs: f64,
    user_agent: String,
    max_concurrent_scrapes: usize,
    max_content_size_bytes: usize,
    http_timeout_secs: u64,
    robots_timeout_secs: u64,
    brave: EngineConfig,
    tavily: EngineConfig,
    duckduckgo: EngineConfig,
    llm: LlmConfig,
    _phantom: PhantomData<State>,
}

impl Default for ConfigBuilder<Incomplete> {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_ttl_seconds: 86_400,
            cache_max_entries: 100,
            rate_limit_interval_secs: 1.0,
            user_agent: "Mozilla/5.0 (compatible; ResearchEngine/1.0)".to_string(),
            max_concurrent_scrapes: 5,
            max_content_size_bytes: 5 * 1024 * 1024,
            http_timeout_secs: 30,
            robots_timeout_secs: 30,
            brave: EngineConfig {
                enabled: false,
                api_key: None,
                max_results: 5,
                timeout_secs: 30,
                retry_count: 3,
            },
            tavily: EngineConfig {
                enabled: false,
                api_key: None,
                max_results: 5,
                timeout_secs: 120,
                retry_count: 3,
            },
            duckduckgo: EngineConfig {
                enabled: true,
                api_key: None,
                max_results: 5,
                timeout_secs: 30,
                retry_count: 3,
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model_name: "llama2".to_string(),
                timeout_secs: 420,
                temperature: 0.7,
                top_p: 0.9,
            },
            _phantom: PhantomData,
        }
    }
}

impl ConfigBuilder<Incomplete> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every field from the process environment (§6.1), falling back
    /// to the same defaults as `new()` for unset keys.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Ok(dir) = env::var("CACHE_DIR") {
            builder.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(v) = env_u64("CACHE_TTL_SECONDS") {
            builder.cache_ttl_seconds = v;
        }
        if let Some(v) = env_usize("CACHE_MAX_ENTRIES") {
            builder.cache_max_entries = v;
        }
        if let Some(v) = env_f64("RATE_LIMIT_INTERVAL") {
            builder.rate_limit_interval_secs = v;
        }
        if let Ok(v) = env::var("USER_AGENT") {
            builder.user_agent = v;
        }
        if let Some(v) = env_usize("MAX_CONCURRENT_SCRAPES") {
            builder.max_concurrent_scrapes = v;
        }
        if let Some(v) = env_usize("MAX_CONTENT_SIZE") {
            builder.max_content_size_bytes = v;
        }

        builder.brave = engine_from_env("BRAVE", builder.brave);
        builder.tavily = engine_from_env("TAVILY", builder.tavily);
        builder.duckduckgo = engine_from_env("DUCKDUCKGO", builder.duckduckgo);

        if let Ok(v) = env::var("OLLAMA_BASE_URL") {
            builder.llm.base_url = v;
        }
        if let Ok(v) = env::var("MODEL_NAME") {
            builder.llm.model_name = v;
        }
        if let Some(v) = env_u64("OLLAMA_TIMEOUT") {
            builder.llm.timeout_secs = v;
        }
        if let Some(v) = env_f64("TEMPERATURE") {
            builder.llm.temperature = v as f32;
        }

        builder
    }

    /// Set the cache directory, the one field required to reach `Complete`.
    #[must_use]
    pub fn cache_dir(self, dir: impl Into<PathBuf>) -> ConfigBuilder<Complete> {
        ConfigBuilder {
            cache_dir: Some(dir.into()),
            cache_ttl_seconds: self.cache_ttl_seconds,
            cache_max_entries: self.cache_max_entries,
            rate_limit_interval_secs: self.rate_limit_interval_secs,
            user_agent: self.user_agent,
            max_concurrent_scrapes: self.max_concurrent_scrapes,
            max_content_size_bytes: self.max_content_size_bytes,
            http_timeout_secs: self.http_timeout_secs,
            robots_timeout_secs: self.robots_timeout_secs,
            brave: self.brave,
            tavily: self.tavily,
            duckduckgo: self.duckduckgo,
            llm: self.llm,
            _phantom: PhantomData,
        }
    }
}

impl<State> ConfigBuilder<State> {
    #[must_use]
    pub fn cache_ttl_seconds(mut self, ttl: u64) -> Self {
        self.cache_ttl_seconds = ttl;
        self
    }

    #[must_use]
    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = max;
        self
    }

    #[must_use]
    pub fn rate_limit_interval_secs(mut self, secs: f64) -> Self {
        self.rate_limit_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    #[must_use]
    pub fn max_concurrent_scrapes(mut self, n: usize) -> Self {
        self.max_concurrent_scrapes = n;
        self
    }

    #[must_use]
    pub fn max_content_size_bytes(mut self, n: usize) -> Self {
        self.max_content_size_bytes = n;
        self
    }

    #[must_use]
    pub fn brave(mut self, engine: EngineConfig) -> Self {
        self.brave = engine;
        self
    }

    #[must_use]
    pub fn tavily(mut self, engine: EngineConfig) -> Self {
        self.tavily = engine;
        self
    }

    #[must_use]
    pub fn duckduckgo(mut self, engine: EngineConfig) -> Self {
        self.duckduckgo = engine;
        self
    }

    #[must_use]
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }
}

impl ConfigBuilder<Complete> {
    /// Build the immutable `Config`, normalizing the cache directory to an
    /// absolute path and validating engine/API-key consistency (§6.1).
    ///
    /// # Errors
    ///
    /// Returns `ResearchError::InvalidInput` if an enabled search engine is
    /// missing its required API key, or if no engine is enabled at all.
    pub fn build(self) -> Result<Config, ResearchError> {
        let cache_dir = self
            .cache_dir
            .expect("Complete state guarantees cache_dir is set");
        let cache_dir = if cache_dir.is_absolute() {
            cache_dir
        } else {
            std::env::current_dir()
                .map_err(|e| ResearchError::FatalInternal {
                    message: format!("failed to resolve current directory: {e}"),
                })?
                .join(cache_dir)
        };

        validate_engine("brave", &self.brave)?;
        validate_engine("tavily", &self.tavily)?;
        validate_engine("duckduckgo", &self.duckduckgo)?;

        if !self.brave.enabled && !self.tavily.enabled && !self.duckduckgo.enabled {
            return Err(ResearchError::InvalidInput {
                message: "at least one search engine must be enabled".to_string(),
            });
        }

        Ok(Config {
            cache_dir,
            cache_ttl_seconds: self.cache_ttl_seconds,
            cache_max_entries: self.cache_max_entries,
            rate_limit_interval_secs: self.rate_limit_interval_secs,
            user_agent: self.user_agent,
            max_concurrent_scrapes: self.max_concurrent_scrapes,
            max_content_size_bytes: self.max_content_size_bytes,
            http_timeout_secs: self.http_timeout_secs,
            robots_timeout_secs: self.robots_timeout_secs,
            brave: self.brave,
            tavily: self.tavily,
            duckduckgo: self.duckduckgo,
            llm: self.llm,
        })
    }
}

fn validate_engine(name: &str, engine: &EngineConfig) -> Result<(), ResearchError> {
    if engine.enabled && name != "duckduckgo" && engine.api_key.is_none() {
        return Err(ResearchError::InvalidInput {
            message: format!("{name} is enabled but no API key is configured"),
        });
    }
    Ok(())
}

fn engine_from_env(prefix: &str, mut base: EngineConfig) -> EngineConfig {
    if let Some(v) = env_bool(&format!("{prefix}_ENABLED")) {
        base.enabled = v;
    }
    if let Ok(v) = env::var(format!("{prefix}_API_KEY")) {
        base.api_key = Some(v);
    }
    if let Some(v) = env_usize(&format!("{prefix}_MAX_RESULTS")) {
        base.max_results = v;
    }
    if let Some(v) = env_u64(&format!("{prefix}_TIMEOUT")) {
        base.timeout_secs = v;
    }
    if let Some(v) = env_u32(&format!("{prefix}_RETRY_COUNT")) {
        base.retry_count = v;
    }
    base
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v.eq_ignore_ascii_case("true"))
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
