//! Publishing operations for the `ProgressEventBus`.
//!
//! Delivery is always best-effort (§4.8): a publish with zero subscribers
//! is not an error the orchestrator should act on — progress updates are
//! advisory, never load-bearing for run correctness.

use crate::events::errors::EventBusError;
use crate::events::types::{BatchPublishResult, ProgressEvent};

use super::core::ProgressEventBus;

impl ProgressEventBus {
    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it (may be zero).
    /// Never blocks and never fails the caller: a broadcast `send` only
    /// errors when there are no receivers, which this method treats as a
    /// (metrics-tracked) drop rather than a propagated error.
    pub async fn publish(&self, event: ProgressEvent) -> Result<usize, EventBusError> {
        match self.sender.send(event) {
            Ok(subscriber_count) => {
                if self.config.enable_metrics {
                    self.metrics.increment_published();
                    self.metrics.update_subscriber_count(subscriber_count);
                    if subscriber_count == 0 {
                        self.metrics.increment_dropped();
                    }
                }
                Ok(subscriber_count)
            }
            Err(_) => {
                if self.config.enable_metrics {
                    self.metrics.increment_dropped();
                }
                Ok(0)
            }
        }
    }

    /// Publish multiple events as a batch with best-effort delivery.
    pub async fn publish_batch(&self, events: Vec<ProgressEvent>) -> BatchPublishResult {
        let total = events.len();
        let mut published = 0;
        let mut failed = 0;
        let mut max_subscribers = 0;

        for event in events {
            match self.sender.send(event) {
                Ok(count) => {
                    published += 1;
                    max_subscribers = std::cmp::max(max_subscribers, count);
                    if self.config.enable_metrics {
                        self.metrics.increment_published();
                        self.metrics.update_subscriber_count(count);
                        if count == 0 {
                            self.metrics.increment_dropped();
                        }
                    }
                }
                Err(_) => {
                    failed += 1;
                    if self.config.enable_metrics {
                        self.metrics.increment_failed();
                    }
                }
            }
        }

        BatchPublishResult {
            total,
            published,
            failed,
            max_subscribers,
        }
    }
}
