//! Subscription operations for the `ProgressEventBus`.

use futures::Stream;
use tokio::sync::broadcast;

use crate::events::streaming::{FilteredReceiver, progress_stream};
use crate::events::types::ProgressEvent;

use super::core::ProgressEventBus;

impl ProgressEventBus {
    /// Subscribe to the raw broadcast channel.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// The lazy finite sequence of `ProgressEvent`s backing §6's
    /// `subscribe_progress`: terminates once the run reaches a terminal
    /// state and the bus is shut down.
    pub fn subscribe_progress(&self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        progress_stream(self.subscribe())
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let count = self.sender.receiver_count();
        if self.config.enable_metrics {
            self.metrics.update_subscriber_count(count);
        }
        count
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Create a filtered subscriber that only receives events passing `filter`.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&ProgressEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}
