//! Wires every component together and exposes the public operations of
//! §6: `start_research`, `get_status`, `get_results`, `cancel`,
//! `subscribe_progress`, `citations`.
//!
//! One `Orchestrator` is built per process and shared (`Arc`) across every
//! caller; each call to `start_research` spawns an independent task owning
//! its own [`RunState`], registered in `runs` for the lifetime of the
//! process so `get_status`/`get_results`/`cancel` can find it later (§3,
//! §5: "the orchestrator never blocks waiting on a run it spawned").

mod run;
mod session;
mod synthesis;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::{Cache, CacheNamespace};
use crate::citation::{CitationStyle, format_bibliography, format_citation};
use crate::config::Config;
use crate::error::ResearchError;
use crate::events::{ProgressEvent, ProgressEventBus};
use crate::llm::{LlmClient, OllamaClient};
use crate::model::{Query, ResearchResult, ResearchRun, RunStatusView};
use crate::rate_limiter::RateLimiter;
use crate::reliability::ReliabilityScorer;
use crate::robots::RobotsPolicy;
use crate::scraper::{Scraper, fetch_semaphore};
use crate::searcher::MultiEngineSearcher;
use crate::strategic_analysis::StrategicAnalysisParser;

const EVENT_BUS_CAPACITY: usize = 256;

/// Per-run mutable state, owned by the task driving [`Orchestrator::run`]
/// and read by every public accessor (§3, §5).
pub(super) struct RunState {
    pub(super) run: Mutex<ResearchRun>,
    pub(super) bus: ProgressEventBus,
    pub(super) cancelled: AtomicBool,
    pub(super) last_progress: AtomicU8,
    pub(super) options: RunOptions,
}

/// Per-run knobs accepted by `start_research` that don't belong on the
/// persisted [`ResearchRun`] entity (§6 operations table: `max_sources`,
/// `depth_level`, optional `focus_areas`).
#[derive(Debug, Clone, Default)]
pub(super) struct RunOptions {
    /// Caps the total number of sources fetched across every focus area;
    /// `None` leaves the per-search `MAX_HITS` cap as the only bound.
    pub(super) max_sources: Option<usize>,
    /// When supplied, the analysis step is skipped entirely and these
    /// strings become the run's focus areas in order (priority 1..=5).
    pub(super) manual_focus_areas: Option<Vec<String>>,
}

/// Input to `start_research` (§6). A struct rather than a long positional
/// parameter list: `user_id` is accepted and logged but never stored
/// against the run (§1 Non-goals: no multi-tenant isolation at the storage
/// layer); `depth_level` is accepted for forward compatibility but does not
/// yet change run behavior, since the distilled spec names it without
/// elaborating its semantics (recorded as an open decision in DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub continuous: bool,
    pub force_refresh: bool,
    pub max_sources: Option<usize>,
    pub depth_level: Option<u8>,
    pub focus_areas: Option<Vec<String>>,
}

/// Every wired component plus the process-lifetime run/result registries
/// (§4.8, §6).
pub struct Orchestrator {
    config: Arc<Config>,
    llm: Arc<dyn LlmClient>,
    searcher: MultiEngineSearcher,
    scraper: Scraper,
    reliability: ReliabilityScorer,
    analysis_parser: StrategicAnalysisParser,
    query_cache: Cache,
    summary_cache: Cache,
    scrape_semaphore: Arc<tokio::sync::Semaphore>,
    runs: DashMap<String, Arc<RunState>>,
    results: DashMap<String, ResearchResult>,
}

impl Orchestrator {
    /// Build every component from `config` and open the query/page/summary
    /// caches (§6.1, §4.3). Returns an `Arc` since `start_research` spawns
    /// a task holding a clone of it for the lifetime of the run.
    pub async fn new(config: Config) -> Result<Arc<Self>, ResearchError> {
        let llm = OllamaClient::new(config.llm());
        Self::with_llm(config, Arc::new(llm)).await
    }

    /// Same as [`Self::new`] but with a caller-supplied LLM backend, for
    /// tests and for callers that want a non-Ollama backend behind the
    /// same `LlmClient` seam (§2.1).
    pub async fn with_llm(config: Config, llm: Arc<dyn LlmClient>) -> Result<Arc<Self>, ResearchError> {
        let config = Arc::new(config);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs()))
            .build()
            .map_err(|e| ResearchError::FatalInternal {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let rate_limiter = RateLimiter::new(config.rate_limit_interval_secs());
        let robots = RobotsPolicy::new(http_client.clone(), Duration::from_secs(config.robots_timeout_secs()));

        let page_cache = Cache::open(
            config.cache_dir(),
            CacheNamespace::Page,
            Duration::from_secs(config.cache_ttl_seconds()),
            config.cache_max_entries(),
        )
        .await?;

        let scraper = Scraper::new(
            http_client.clone(),
            rate_limiter,
            robots,
            page_cache,
            config.user_agent().to_string(),
            Duration::from_secs(config.http_timeout_secs()),
            config.max_content_size_bytes(),
        );

        let searcher = MultiEngineSearcher::from_config(&config, http_client.clone());

        let query_cache = Cache::open(
            config.cache_dir(),
            CacheNamespace::Query,
            Duration::from_secs(config.cache_ttl_seconds()),
            config.cache_max_entries(),
        )
        .await?;
        let summary_cache = Cache::open(
            config.cache_dir(),
            CacheNamespace::Summary,
            Duration::from_secs(config.cache_ttl_seconds()),
            config.cache_max_entries(),
        )
        .await?;

        let scrape_semaphore = fetch_semaphore(config.max_concurrent_scrapes());

        Ok(Arc::new(Self {
            config,
            llm,
            searcher,
            scraper,
            reliability: ReliabilityScorer::new(),
            analysis_parser: StrategicAnalysisParser::new(),
            query_cache,
            summary_cache,
            scrape_semaphore,
            runs: DashMap::new(),
            results: DashMap::new(),
        }))
    }

    /// Start a new research run and return its `request_id` (§6). The run
    /// itself proceeds on a spawned task; this call returns as soon as the
    /// run is registered, without waiting on any network activity.
    ///
    /// # Errors
    /// Returns `ResearchError::InvalidInput` if `request.query` fails
    /// [`Query::new`] validation.
    pub fn start_research(self: &Arc<Self>, request: StartRequest) -> Result<String, ResearchError> {
        if let Some(user_id) = &request.user_id {
            log::debug!("starting research run for user {user_id}");
        }

        let query = Query::new(request.query)?;
        let request_id = Uuid::new_v4().to_string();

        let options = RunOptions {
            max_sources: request.max_sources,
            manual_focus_areas: request.focus_areas,
        };

        let run = ResearchRun::new(request_id.clone(), query.as_str().to_string(), request.continuous, request.force_refresh);
        let state = Arc::new(RunState {
            run: Mutex::new(run),
            bus: ProgressEventBus::new(EVENT_BUS_CAPACITY),
            cancelled: AtomicBool::new(false),
            last_progress: AtomicU8::new(0),
            options,
        });
        self.runs.insert(request_id.clone(), state);

        let orchestrator = Arc::clone(self);
        let spawned_id = request_id.clone();
        tokio::spawn(async move { orchestrator.run(spawned_id, query).await });

        Ok(request_id)
    }

    /// Snapshot of a run's current status (§6), or `None` if `request_id`
    /// is unknown.
    pub async fn get_status(&self, request_id: &str) -> Option<RunStatusView> {
        let state = self.runs.get(request_id).map(|e| Arc::clone(e.value()))?;
        let run = state.run.lock().await;
        Some(RunStatusView {
            request_id: run.request_id.clone(),
            status: run.status,
            progress_percent: state.last_progress.load(Ordering::SeqCst),
            current_focus: run.current_focus.clone(),
            errors: run.errors.clone(),
            started_at: run.started_at,
            ended_at: run.ended_at,
        })
    }

    /// The final (or partial, if cancelled) result of a run, once it has
    /// reached a terminal state (§6). `None` before then or if
    /// `request_id` is unknown.
    #[must_use]
    pub fn get_results(&self, request_id: &str) -> Option<ResearchResult> {
        self.results.get(request_id).map(|e| e.value().clone())
    }

    /// Request cancellation of an in-progress run (§6, §5). Returns `false`
    /// if `request_id` is unknown; a run already in a terminal state
    /// silently ignores the flag (§3: "terminal is sticky").
    pub fn cancel(&self, request_id: &str) -> bool {
        let Some(state) = self.runs.get(request_id) else {
            return false;
        };
        state.cancelled.store(true, Ordering::SeqCst);
        true
    }

    /// The lazy finite sequence of `ProgressEvent`s for a run (§6), or
    /// `None` if `request_id` is unknown.
    #[must_use]
    pub fn subscribe_progress(&self, request_id: &str) -> Option<impl Stream<Item = ProgressEvent> + Send + 'static> {
        let state = self.runs.get(request_id)?;
        Some(state.bus.subscribe_progress())
    }

    /// Re-render a completed run's sources as citations plus a bibliography
    /// in the requested style (§4.9, §6): `(per-source citations,
    /// rendered bibliography)`. `None` if `request_id` is unknown or the
    /// run hasn't produced a result yet.
    #[must_use]
    pub fn citations(&self, request_id: &str, style: CitationStyle) -> Option<(Vec<String>, String)> {
        let result = self.results.get(request_id)?;
        let citations: Vec<String> = result.sources.iter().map(|s| format_citation(s, style)).collect();
        let bibliography = format_bibliography(&result.sources, style).rendered();
        Some((citations, bibliography))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Ergonomic per-run handle bundling a `request_id` with the `Orchestrator`
/// it belongs to, so callers (the CLI in particular) don't have to thread
/// both through separately (§6).
pub struct RunHandle {
    orchestrator: Arc<Orchestrator>,
    request_id: String,
}

impl RunHandle {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, request_id: String) -> Self {
        Self { orchestrator, request_id }
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub async fn status(&self) -> Option<RunStatusView> {
        self.orchestrator.get_status(&self.request_id).await
    }

    #[must_use]
    pub fn result(&self) -> Option<ResearchResult> {
        self.orchestrator.get_results(&self.request_id)
    }

    pub fn cancel(&self) -> bool {
        self.orchestrator.cancel(&self.request_id)
    }

    #[must_use]
    pub fn subscribe_progress(&self) -> Option<impl Stream<Item = ProgressEvent> + Send + 'static> {
        self.orchestrator.subscribe_progress(&self.request_id)
    }

    /// Drain the progress stream to completion and return the final result.
    /// Used by the CLI's blocking "run to completion" mode.
    pub async fn wait(&self) -> Option<ResearchResult> {
        use futures::StreamExt;
        if let Some(mut stream) = self.subscribe_progress() {
            while stream.next().await.is_some() {}
        }
        self.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    struct StubLlm;

    #[async_trait::async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _prompt: &str, _max_tokens: Option<u32>, _temperature: Option<f32>) -> Result<String, LlmError> {
            Ok("1. general background\n2. recent developments".to_string())
        }
    }

    async fn test_orchestrator() -> (tempfile::TempDir, Arc<Orchestrator>) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .cache_dir(dir.path())
            .build()
            .unwrap();
        let orchestrator = Orchestrator::with_llm(config, Arc::new(StubLlm)).await.unwrap();
        (dir, orchestrator)
    }

    #[tokio::test]
    async fn start_research_rejects_an_empty_query() {
        let (_dir, orchestrator) = test_orchestrator().await;
        let request = StartRequest { query: String::new(), ..Default::default() };
        assert!(orchestrator.start_research(request).is_err());
    }

    #[tokio::test]
    async fn start_research_registers_a_pollable_run() {
        let (_dir, orchestrator) = test_orchestrator().await;
        let request = StartRequest {
            query: "what is the current state of fusion energy research".to_string(),
            max_sources: Some(0),
            ..Default::default()
        };
        let request_id = orchestrator.start_research(request).unwrap();

        let status = orchestrator.get_status(&request_id).await;
        assert!(status.is_some());
        assert_eq!(status.unwrap().request_id, request_id);
    }

    #[tokio::test]
    async fn cancel_reports_unknown_run_ids_as_false() {
        let (_dir, orchestrator) = test_orchestrator().await;
        assert!(!orchestrator.cancel("not-a-real-run-id"));
    }

    #[tokio::test]
    async fn get_results_and_citations_are_none_before_completion() {
        let (_dir, orchestrator) = test_orchestrator().await;
        let request = StartRequest {
            query: "what is the current state of fusion energy research".to_string(),
            ..Default::default()
        };
        let request_id = orchestrator.start_research(request).unwrap();
        assert!(orchestrator.get_results(&request_id).is_none());
        assert!(orchestrator.citations(&request_id, CitationStyle::Apa).is_none());
    }

    #[tokio::test]
    async fn run_handle_forwards_to_its_orchestrator() {
        let (_dir, orchestrator) = test_orchestrator().await;
        let request = StartRequest {
            query: "what is the current state of fusion energy research".to_string(),
            max_sources: Some(0),
            ..Default::default()
        };
        let request_id = orchestrator.start_research(request).unwrap();
        let handle = RunHandle::new(Arc::clone(&orchestrator), request_id.clone());
        assert_eq!(handle.request_id(), request_id);
        assert!(handle.status().await.is_some());
        assert!(handle.cancel());
    }
}
