pub mod cache;
pub mod citation;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod rate_limiter;
pub mod reliability;
pub mod robots;
pub mod scraper;
pub mod searcher;
pub mod strategic_analysis;
pub mod utils;

pub use cache::{Cache, CacheEntry, CacheNamespace, CacheStats};
pub use citation::{Bibliography, CitationStyle, format_citation, format_bibliography};
pub use config::Config;
pub use error::ResearchError;
pub use events::{ProgressEvent, ProgressEventBus};
pub use llm::{LlmClient, LlmError, OllamaClient};
pub use model::{
    AnalysisResult, FocusArea, Hit, Query, ResearchResult, ResearchRun, RunStatus, RunStatusView,
    ScrapedContent, Source,
};
pub use orchestrator::{Orchestrator, RunHandle, StartRequest};
pub use rate_limiter::RateLimiter;
pub use reliability::ReliabilityScorer;
pub use robots::RobotsPolicy;
pub use scraper::Scraper;
pub use searcher::{MultiEngineSearcher, SearchEngine};
pub use strategic_analysis::StrategicAnalysisParser;
