//! Data entities for the research pipeline (§3).
//!
//! These are the value types that cross component boundaries: a `Query` is
//! validated once at the system edge, a `Source`/`ScrapedContent` is parsed
//! once by the scraper, and everything downstream (citations, synthesis,
//! caching) consumes the typed value rather than re-deriving fields from
//! raw HTML or JSON.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ResearchError;

/// The user-supplied research question, validated and trimmed (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    /// Trim and validate a raw query string.
    ///
    /// # Errors
    /// Returns `ResearchError::InvalidInput` if the trimmed query is empty
    /// or exceeds 1000 characters.
    pub fn new(raw: impl Into<String>) -> Result<Self, ResearchError> {
        let trimmed = raw.into().trim().to_string();
        if trimmed.is_empty() || trimmed.chars().count() > 1000 {
            return Err(ResearchError::InvalidInput {
                message: format!(
                    "query must be 1-1000 characters after trimming, got {}",
                    trimmed.chars().count()
                ),
            });
        }
        Ok(Self(trimmed))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A prioritized sub-topic produced by the [`crate::strategic_analysis::StrategicAnalysisParser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusArea {
    pub area: String,
    /// 1 (highest) .. 5 (lowest).
    pub priority: u8,
    pub source_query: String,
    pub search_queries: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FocusArea {
    #[must_use]
    pub fn new(area: String, priority: u8, source_query: String) -> Self {
        let search_queries = vec![source_query.clone()];
        Self {
            area,
            priority: priority.clamp(1, 5),
            source_query,
            search_queries,
            created_at: Utc::now(),
        }
    }
}

/// The parsed output of the analysis step: a set of focus areas plus a
/// confidence score in the derivation of `AnalysisResult::confidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub original_question: String,
    pub focus_areas: Vec<FocusArea>,
    pub raw_response: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Compute confidence per §3:
    /// `0.3*(question >= 3 words) + 0.2*(|areas|/5) + 0.2*(distinct
    /// priorities/5) + 0.3*(fraction of areas with >= 3 words and a valid
    /// priority)`, rounded to 2 decimals.
    #[must_use]
    pub fn compute_confidence(original_question: &str, focus_areas: &[FocusArea]) -> f64 {
        let question_term = if original_question.split_whitespace().count() >= 3 {
            0.3
        } else {
            0.0
        };

        let areas_term = 0.2 * (focus_areas.len().min(5) as f64 / 5.0);

        let distinct_priorities: HashSet<u8> = focus_areas.iter().map(|f| f.priority).collect();
        let priorities_term = 0.2 * (distinct_priorities.len().min(5) as f64 / 5.0);

        let valid_count = focus_areas
            .iter()
            .filter(|f| f.area.split_whitespace().count() >= 3 && (1..=5).contains(&f.priority))
            .count();
        let quality_term = if focus_areas.is_empty() {
            0.0
        } else {
            0.3 * (valid_count as f64 / focus_areas.len() as f64)
        };

        let raw = question_term + areas_term + priorities_term + quality_term;
        (raw * 100.0).round() / 100.0
    }
}

/// A single search-engine result, prior to fetch (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub engine: String,
}

/// A post-fetch, content-bearing, scored artifact used for synthesis and
/// citation (§3, §4.6, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub publication_date: Option<String>,
    pub site_name: String,
    pub content: String,
    pub snippet: String,
    pub access_date: DateTime<Utc>,
    pub reliability: f64,
    pub content_hash: String,
}

/// The direct product of scraping a single URL (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub url: String,
    pub content: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    pub site_name: String,
    pub access_time: DateTime<Utc>,
    pub content_type: String,
    pub word_count: usize,
    pub content_hash: String,
    pub status_code: u16,
    pub is_valid: bool,
    pub error: Option<String>,
}

/// Lifecycle state of a [`ResearchRun`] (§3 Lifecycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Orchestrator-owned state for a single research query (§3).
///
/// Exclusively owned and mutated by the `Orchestrator` task running this
/// request; `seen_urls` in particular is never touched concurrently (§5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRun {
    pub request_id: String,
    pub query: String,
    pub status: RunStatus,
    pub focus_areas: Vec<FocusArea>,
    pub seen_urls: HashSet<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub continuous_mode: bool,
    pub force_refresh: bool,
    pub sources_found: usize,
    pub sources_processed: usize,
    pub current_focus: Option<String>,
}

impl ResearchRun {
    #[must_use]
    pub fn new(request_id: String, query: String, continuous_mode: bool, force_refresh: bool) -> Self {
        Self {
            request_id,
            query,
            status: RunStatus::Pending,
            focus_areas: Vec::new(),
            seen_urls: HashSet::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            continuous_mode,
            force_refresh,
            sources_found: 0,
            sources_processed: 0,
            current_focus: None,
        }
    }

    /// Record a non-fatal error, de-duplicating against prior entries
    /// (§7: "the final `ResearchResult.errors` contains a de-duplicated
    /// summary").
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.errors.iter().any(|e| e == &message) {
            self.errors.push(message);
        }
    }

    /// Transition to a terminal status; idempotent once terminal (§3:
    /// "terminal is sticky").
    pub fn finish(&mut self, status: RunStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}

/// The caller-visible outcome of a research run (§3, §6 `get_results`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub request_id: String,
    pub summary: String,
    pub sources: Vec<Source>,
    pub citations: Vec<String>,
    pub bibliography: String,
    pub focus_areas: Vec<FocusArea>,
    pub reliability: f64,
    pub status: RunStatus,
    pub processing_time_ms: u64,
    pub errors: Vec<String>,
    pub cache_hit: bool,
}

impl ResearchResult {
    /// Mean of source reliabilities, 0.0 when there are no sources.
    #[must_use]
    pub fn mean_reliability(sources: &[Source]) -> f64 {
        if sources.is_empty() {
            return 0.0;
        }
        sources.iter().map(|s| s.reliability).sum::<f64>() / sources.len() as f64
    }
}

/// Status snapshot returned by `get_status` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusView {
    pub request_id: String,
    pub status: RunStatus,
    pub progress_percent: u8,
    pub current_focus: Option<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_empty() {
        assert!(Query::new("   ").is_err());
    }

    #[test]
    fn query_rejects_too_long() {
        let long = "a".repeat(1001);
        assert!(Query::new(long).is_err());
    }

    #[test]
    fn query_trims_whitespace() {
        let q = Query::new("  hello world  ").unwrap();
        assert_eq!(q.as_str(), "hello world");
    }

    #[test]
    fn confidence_is_bounded_and_rounded() {
        let areas = vec![
            FocusArea::new("first sub topic of interest".into(), 1, "q".into()),
            FocusArea::new("second sub topic of interest".into(), 2, "q".into()),
        ];
        let c = AnalysisResult::compute_confidence("what is the history of rust", &areas);
        assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn confidence_zero_areas_is_still_bounded() {
        let c = AnalysisResult::compute_confidence("x", &[]);
        assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn run_status_terminal_is_sticky() {
        let mut run = ResearchRun::new("r1".into(), "q".into(), false, false);
        run.finish(RunStatus::Completed);
        run.finish(RunStatus::Failed);
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn run_errors_deduplicate() {
        let mut run = ResearchRun::new("r1".into(), "q".into(), false, false);
        run.record_error("boom");
        run.record_error("boom");
        assert_eq!(run.errors.len(), 1);
    }
}
