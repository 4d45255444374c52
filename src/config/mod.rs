//! Immutable process configuration (§1.1, §6.1).
//!
//! A single `Config` is built once at process start — from defaults,
//! overridden by environment variables — and passed by reference (`&Config`
//! / `Arc<Config>`) into every component constructor. There are no global
//! mutable configuration statics.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{Complete, ConfigBuilder, Incomplete};
pub use types::{Config, EngineConfig, LlmConfig};

impl Config {
    /// Start building a `Config` from defaults (§6.1).
    #[must_use]
    pub fn builder() -> ConfigBuilder<Incomplete> {
        ConfigBuilder::new()
    }

    /// Start building a `Config` seeded from the process environment (§6.1).
    #[must_use]
    pub fn from_env() -> ConfigBuilder<Incomplete> {
        ConfigBuilder::from_env()
    }
}
