//! Event type definitions for the progress-reporting system (§4.8).

use serde::{Deserialize, Serialize};

use crate::model::RunStatus;

/// A single progress update emitted by the orchestrator at each phase
/// transition and for each processed source (§4.8).
///
/// Delivery is best-effort: dropping an update must never stall the run,
/// which is why publishing goes through a bounded broadcast channel rather
/// than an unbounded queue or a blocking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub request_id: String,
    pub focus_area: Option<String>,
    pub status: RunStatus,
    pub progress_percent: u8,
    pub message: String,
    pub sources_found: usize,
    pub sources_processed: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        status: RunStatus,
        progress_percent: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            focus_area: None,
            status,
            progress_percent: progress_percent.min(100),
            message: message.into(),
            sources_found: 0,
            sources_processed: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn with_focus_area(mut self, focus_area: impl Into<String>) -> Self {
        self.focus_area = Some(focus_area.into());
        self
    }

    #[must_use]
    pub fn with_counts(mut self, sources_found: usize, sources_processed: usize) -> Self {
        self.sources_found = sources_found;
        self.sources_processed = sources_processed;
        self
    }
}

/// Reason the event bus for a run was shut down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShutdownReason {
    RunCompleted,
    RunFailed,
    RunCancelled,
}

impl From<RunStatus> for ShutdownReason {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => ShutdownReason::RunCompleted,
            RunStatus::Cancelled => ShutdownReason::RunCancelled,
            _ => ShutdownReason::RunFailed,
        }
    }
}

/// Result of publishing a batch of events in one call. The event bus uses
/// best-effort delivery throughout, so this is a report, not a `Result`:
/// individual failures (no subscribers) never stop the remaining sends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchPublishResult {
    pub total: usize,
    pub published: usize,
    pub failed: usize,
    pub max_subscribers: usize,
}

impl BatchPublishResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.published == self.total && self.failed == 0
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
