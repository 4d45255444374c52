//! The per-query run state machine (§4.8): `pending -> in_progress ->
//! {completed, failed, cancelled}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::cache::cache_key;
use crate::citation::{CitationStyle, format_bibliography, format_citation};
use crate::events::ProgressEvent;
use crate::model::{AnalysisResult, FocusArea, Hit, Query, ResearchResult, RunStatus, Source};

use super::session::{SessionArtifact, SessionStore};
use super::synthesis;
use super::{Orchestrator, RunState};

const ANALYZE_ATTEMPTS: u32 = 3;
const SEARCH_ATTEMPTS: u32 = 3;
const SYNTHESIZE_ATTEMPTS: u32 = 2;
const SUMMARIZE_BUDGET: Duration = Duration::from_secs(30);
const FOCUS_QUERY_MAX_CHARS: usize = 200;
const MAX_HITS_PER_FOCUS_AREA: usize = 5;

impl Orchestrator {
    /// Drive a single research run to completion (§4.8). Spawned as its own
    /// task by `start_research`; every suspension point checks the run's
    /// cancellation flag so a `cancel()` call is honored within one
    /// in-flight wait rather than only between phases (§5).
    pub(super) async fn run(self: Arc<Self>, request_id: String, query: Query) {
        let start = Instant::now();
        let Some(state) = self.runs.get(&request_id).map(|entry| Arc::clone(entry.value())) else {
            return;
        };

        self.transition(&state, &request_id, RunStatus::InProgress, 5, "starting research run")
            .await;

        let force_refresh = state.run.lock().await.force_refresh;
        if !force_refresh {
            if let Some(cached) = self.try_query_cache(&query).await {
                self.finish_with_result(&state, &request_id, cached, true, start).await;
                return;
            }
        }

        if self.is_cancelled(&state) {
            self.finish_cancelled(&state, &request_id, Vec::new(), start).await;
            return;
        }

        let analysis = self.analyze(&request_id, &query, &state).await;
        {
            let mut run = state.run.lock().await;
            run.focus_areas = analysis.focus_areas.clone();
        }
        self.publish(
            &state,
            ProgressEvent::new(&request_id, RunStatus::InProgress, 15, "analysis complete"),
        )
        .await;

        let session_store = SessionStore::new(self.config.sessions_dir(), &request_id);
        let mut sources: Vec<Source> = Vec::new();
        let continuous = state.run.lock().await.continuous_mode;

        'focus_areas: for (index, focus) in analysis.focus_areas.iter().enumerate() {
            if self.is_cancelled(&state) {
                break;
            }
            if state.options.max_sources.is_some_and(|max| sources.len() >= max) {
                break;
            }

            {
                let mut run = state.run.lock().await;
                run.current_focus = Some(focus.area.clone());
            }
            self.publish(
                &state,
                ProgressEvent::new(&request_id, RunStatus::InProgress, 20, format!("researching: {}", focus.area))
                    .with_focus_area(focus.area.clone()),
            )
            .await;

            let search_query = Self::focus_search_query(&query, focus, index == 0);
            let mut hits = self.search_with_retry(&search_query).await;
            hits.truncate(MAX_HITS_PER_FOCUS_AREA);

            {
                let mut run = state.run.lock().await;
                run.sources_found += hits.len();
            }

            let mut unseen_hits = Vec::new();
            for hit in hits {
                let first_seen = {
                    let mut run = state.run.lock().await;
                    run.seen_urls.insert(hit.url.clone())
                };
                if first_seen {
                    unseen_hits.push(hit);
                }
            }

            let mut fetches: FuturesUnordered<_> = unseen_hits
                .into_iter()
                .map(|hit| self.fetch_and_summarize(hit, focus.area.clone()))
                .collect();

            while let Some(outcome) = fetches.next().await {
                if self.is_cancelled(&state) {
                    break 'focus_areas;
                }
                if let Some((source, artifact)) = outcome {
                    session_store.persist(&artifact).await;
                    sources.push(source);
                    {
                        let mut run = state.run.lock().await;
                        run.sources_processed += 1;
                    }
                    if state.options.max_sources.is_some_and(|max| sources.len() >= max) {
                        break 'focus_areas;
                    }
                }
            }

            self.publish(
                &state,
                ProgressEvent::new(&request_id, RunStatus::InProgress, 50, format!("finished focus area: {}", focus.area))
                    .with_focus_area(focus.area.clone())
                    .with_counts(sources.len(), sources.len()),
            )
            .await;

            if !continuous {
                break 'focus_areas;
            }
        }

        if sources.is_empty() && !analysis.focus_areas.is_empty() {
            state
                .run
                .lock()
                .await
                .record_error("no sources could be retrieved for any focus area".to_string());
        }

        sources.sort_by(|a, b| b.reliability.partial_cmp(&a.reliability).unwrap_or(std::cmp::Ordering::Equal));

        if self.is_cancelled(&state) {
            self.finish_cancelled(&state, &request_id, sources, start).await;
            session_store.cleanup().await;
            return;
        }

        self.publish(&state, ProgressEvent::new(&request_id, RunStatus::InProgress, 75, "synthesizing summary"))
            .await;

        let artifacts = session_store.read_all().await;
        let all_sources_failed = !analysis.focus_areas.is_empty() && sources.is_empty();
        let summary = if all_sources_failed {
            synthesis::fallback_summary(&analysis.focus_areas, 0)
        } else {
            synthesis::synthesize_summary(self.llm.as_ref(), query.as_str(), &analysis.focus_areas, &artifacts, SYNTHESIZE_ATTEMPTS).await
        };
        self.persist_summary_cache(&query, &summary).await;

        let default_style = CitationStyle::Apa;
        let citations: Vec<String> = sources.iter().map(|s| format_citation(s, default_style)).collect();
        let bibliography = format_bibliography(&sources, default_style).rendered();
        let mean_reliability = ResearchResult::mean_reliability(&sources);
        let errors = state.run.lock().await.errors.clone();
        let status = if all_sources_failed { RunStatus::Failed } else { RunStatus::Completed };

        let result = ResearchResult {
            request_id: request_id.clone(),
            summary,
            sources,
            citations,
            bibliography,
            focus_areas: analysis.focus_areas,
            reliability: mean_reliability,
            status,
            processing_time_ms: start.elapsed().as_millis() as u64,
            errors,
            cache_hit: false,
        };

        if status == RunStatus::Completed {
            self.persist_query_cache(&query, &result).await;
        }
        self.finish_with_result(&state, &request_id, result, false, start).await;
        session_store.cleanup().await;
    }

    /// LLM-driven focus-area analysis with fallback synthesis (§4.8 step
    /// 3): up to 3 attempts with `2^n` second backoff; the second attempt
    /// uses a more rigid retry template; if every attempt fails to parse, a
    /// deterministic 2-item fallback is used at confidence 0.3.
    async fn analyze(&self, request_id: &str, query: &Query, state: &Arc<RunState>) -> AnalysisResult {
        if let Some(areas) = &state.options.manual_focus_areas {
            let focus_areas: Vec<FocusArea> = areas
                .iter()
                .enumerate()
                .take(5)
                .map(|(i, area)| FocusArea::new(area.clone(), (i + 1) as u8, query.as_str().to_string()))
                .collect();
            let confidence = AnalysisResult::compute_confidence(query.as_str(), &focus_areas);
            log::debug!("analysis for {request_id} skipped: caller supplied {} focus areas", focus_areas.len());
            return AnalysisResult {
                original_question: query.as_str().to_string(),
                focus_areas,
                raw_response: String::new(),
                confidence,
                created_at: Utc::now(),
            };
        }

        for attempt in 0..ANALYZE_ATTEMPTS {
            if self.is_cancelled(state) {
                break;
            }

            let prompt = if attempt == 1 {
                synthesis::analysis_retry_prompt(query.as_str())
            } else {
                synthesis::analysis_prompt(query.as_str())
            };

            match self.llm.complete(&prompt, Some(500), None).await {
                Ok(text) => {
                    if let Some(parsed) = self.analysis_parser.parse(query.as_str(), &text) {
                        return parsed;
                    }
                    log::warn!("analysis attempt {}/{ANALYZE_ATTEMPTS} for {request_id} did not parse", attempt + 1);
                }
                Err(e) => {
                    log::warn!("analysis attempt {}/{ANALYZE_ATTEMPTS} for {request_id} failed: {e}", attempt + 1);
                }
            }

            if attempt + 1 < ANALYZE_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
            }
        }

        log::warn!("analysis for {request_id} exhausted all attempts; using fallback focus areas");
        AnalysisResult {
            original_question: query.as_str().to_string(),
            focus_areas: synthesis::fallback_focus_areas(query.as_str()),
            raw_response: String::new(),
            confidence: 0.3,
            created_at: Utc::now(),
        }
    }

    /// Search with up to 3 attempts of exponential backoff at the
    /// aggregate level (§4.8 step 4b), on top of each engine's own
    /// per-engine retry.
    async fn search_with_retry(&self, query: &str) -> Vec<Hit> {
        let mut hits = Vec::new();
        for attempt in 0..SEARCH_ATTEMPTS {
            hits = self.searcher.search(query).await;
            if !hits.is_empty() || attempt + 1 == SEARCH_ATTEMPTS {
                break;
            }
            tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
        }
        hits
    }

    /// Scrape one hit and summarize it (§4.8 step 4c): bounded by the
    /// shared scrape semaphore (§5) and a 30s LLM budget, falling back to a
    /// content excerpt when summarization fails or times out.
    async fn fetch_and_summarize(&self, hit: Hit, focus_area: String) -> Option<(Source, SessionArtifact)> {
        let _permit = self.scrape_semaphore.acquire().await.ok()?;
        let scraped = self.scraper.fetch(&hit.url).await;
        if !scraped.is_valid {
            return None;
        }

        let prompt = synthesis::summarize_prompt(&hit.url, &scraped.content);
        let summary = match tokio::time::timeout(SUMMARIZE_BUDGET, self.llm.complete(&prompt, Some(150), None)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => synthesis::fallback_snippet(&scraped.content),
        };

        let reliability = self.reliability.score(&hit.url);
        let source = Source {
            url: scraped.url.clone(),
            title: scraped.title.clone(),
            author: scraped.author.clone(),
            publication_date: scraped.publication_date.clone(),
            site_name: scraped.site_name.clone(),
            content: scraped.content.clone(),
            snippet: summary.clone(),
            access_date: scraped.access_time,
            reliability,
            content_hash: scraped.content_hash.clone(),
        };
        let artifact = SessionArtifact {
            url: scraped.url,
            focus_area,
            title: source.title.clone(),
            summary,
            content: scraped.content,
            reliability,
        };
        Some((source, artifact))
    }

    /// For the first focus area, search the original query unchanged; for
    /// later ones, append the focus area and truncate to 200 chars (§4.8
    /// step 4a).
    fn focus_search_query(query: &Query, focus: &FocusArea, is_first: bool) -> String {
        if is_first {
            return query.as_str().to_string();
        }
        let combined = format!("{} {}", query.as_str(), focus.area);
        crate::utils::safe_truncate_chars(&combined, FOCUS_QUERY_MAX_CHARS).to_string()
    }

    fn is_cancelled(&self, state: &RunState) -> bool {
        state.cancelled.load(Ordering::SeqCst)
    }

    async fn publish(&self, state: &RunState, event: ProgressEvent) {
        state.last_progress.store(event.progress_percent, Ordering::SeqCst);
        let _ = state.bus.publish(event).await;
    }

    async fn transition(&self, state: &RunState, request_id: &str, status: RunStatus, pct: u8, message: &str) {
        {
            let mut run = state.run.lock().await;
            run.status = status;
        }
        self.publish(state, ProgressEvent::new(request_id, status, pct, message.to_string())).await;
    }

    async fn try_query_cache(&self, query: &Query) -> Option<ResearchResult> {
        let key = cache_key(query.as_str(), &[]);
        let cached = self.query_cache.get(&key).await.ok().flatten()?;
        serde_json::from_str(&cached).ok()
    }

    async fn persist_query_cache(&self, query: &Query, result: &ResearchResult) {
        let key = cache_key(query.as_str(), &[]);
        let Ok(serialized) = serde_json::to_string(result) else {
            return;
        };
        if let Err(e) = self.query_cache.set(&key, query.as_str(), &serialized, HashMap::new(), None).await {
            log::warn!("failed to persist query cache entry for {}: {e}", query.as_str());
        }
    }

    async fn persist_summary_cache(&self, query: &Query, summary: &str) {
        let key = cache_key(query.as_str(), &[("stage", "summary")]);
        if let Err(e) = self.summary_cache.set(&key, query.as_str(), summary, HashMap::new(), None).await {
            log::warn!("failed to persist summary cache entry for {}: {e}", query.as_str());
        }
    }

    async fn finish_with_result(
        &self,
        state: &RunState,
        request_id: &str,
        mut result: ResearchResult,
        cache_hit: bool,
        start: Instant,
    ) {
        result.cache_hit = cache_hit;
        if !cache_hit {
            result.processing_time_ms = start.elapsed().as_millis() as u64;
        }
        {
            let mut run = state.run.lock().await;
            run.finish(result.status);
        }
        let final_status = result.status;
        let sources_done = result.sources.len();
        self.results.insert(request_id.to_string(), result);

        let final_event = ProgressEvent::new(request_id, final_status, 100, "research run complete")
            .with_counts(sources_done, sources_done);
        state.bus.shutdown_gracefully(final_event).await;
    }

    async fn finish_cancelled(&self, state: &RunState, request_id: &str, sources: Vec<Source>, start: Instant) {
        let default_style = CitationStyle::Apa;
        let citations: Vec<String> = sources.iter().map(|s| format_citation(s, default_style)).collect();
        let bibliography = format_bibliography(&sources, default_style).rendered();
        let mean_reliability = ResearchResult::mean_reliability(&sources);

        let (focus_areas, errors) = {
            let mut run = state.run.lock().await;
            run.record_error("run cancelled".to_string());
            run.finish(RunStatus::Cancelled);
            (run.focus_areas.clone(), run.errors.clone())
        };

        let result = ResearchResult {
            request_id: request_id.to_string(),
            summary: synthesis::fallback_summary(&focus_areas, sources.len()),
            sources,
            citations,
            bibliography,
            focus_areas,
            reliability: mean_reliability,
            status: RunStatus::Cancelled,
            processing_time_ms: start.elapsed().as_millis() as u64,
            errors,
            cache_hit: false,
        };
        self.results.insert(request_id.to_string(), result);

        let final_event = ProgressEvent::new(request_id, RunStatus::Cancelled, 100, "research run cancelled");
        state.bus.shutdown_gracefully(final_event).await;
    }
}
