//! Shutdown operations for the `ProgressEventBus`.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::events::types::ProgressEvent;

use super::core::ProgressEventBus;

impl ProgressEventBus {
    /// Signal shutdown to all subscribers.
    ///
    /// This method is idempotent - calling it multiple times is safe.
    /// All clones of this bus share the same shutdown signal.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        log::debug!("progress event bus shutdown signalled");
    }

    /// Wait for shutdown signal.
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.notified().await;
    }

    /// Check if shutdown has been signalled.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the bus for a run that just reached a terminal
    /// state (§4.8, §6 `subscribe_progress`: the subscriber sequence
    /// terminates when the run does):
    ///
    /// 1. Publish the final terminal-status `ProgressEvent`.
    /// 2. Give subscribers a short window to drain it.
    /// 3. Signal shutdown, closing every outstanding `subscribe_progress` stream.
    pub async fn shutdown_gracefully(&self, final_event: ProgressEvent) {
        log::info!(
            "beginning graceful shutdown of progress event bus for run {}",
            final_event.request_id
        );

        let _ = self.publish(final_event).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();

        log::info!("progress event bus shutdown complete");
    }
}
