//! Crate-wide error taxonomy.
//!
//! Every fallible component operation returns `Result<T, ResearchError>`.
//! The orchestrator is the only place these get downgraded into a logged,
//! counted entry on `ResearchRun.errors` instead of propagating further —
//! see the propagation policy on [`ResearchError::is_fatal`].

use thiserror::Error;

/// The error taxonomy for the research pipeline.
///
/// Variants map directly onto retry/propagation policy: `TransientNetwork`
/// and `LLMFailure` are retried with backoff at their call sites;
/// `ContentRejected` and `ProtocolError` mark a single source invalid
/// without failing the run; `Cancelled` and `FatalInternal` are the only
/// variants that can terminate a run as `failed`/`cancelled` outright.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("transient network failure: {source}")]
    TransientNetwork {
        #[source]
        source: reqwest::Error,
    },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("content rejected: {reason}")]
    ContentRejected { reason: String },

    #[error("LLM call failed: {message}")]
    LLMFailure { message: String },

    #[error("cache corruption: {message}")]
    CacheCorruption { message: String },

    #[error("timed out waiting on {what}")]
    Timeout { what: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {message}")]
    FatalInternal { message: String },
}

impl ResearchError {
    /// Whether this error is worth retrying with backoff (§7 propagation
    /// policy: `TransientNetwork` and `LLMFailure` are retried, the rest
    /// are terminal for the operation that raised them).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResearchError::TransientNetwork { .. } | ResearchError::LLMFailure { .. }
        )
    }

    /// Whether this error must surface as the run's terminal `failed`
    /// state rather than being captured into `ResearchRun.errors`.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResearchError::FatalInternal { .. })
    }
}

impl From<reqwest::Error> for ResearchError {
    fn from(source: reqwest::Error) -> Self {
        ResearchError::TransientNetwork { source }
    }
}
