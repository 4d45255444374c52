//! Streaming and filtering functionality for progress event receivers.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::types::ProgressEvent;

/// Filtered event receiver wrapper.
pub struct FilteredReceiver<F>
where
    F: Fn(&ProgressEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<ProgressEvent>,
    filter: Arc<F>,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&ProgressEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<ProgressEvent>, filter: F) -> Self {
        Self {
            receiver,
            filter: Arc::new(filter),
        }
    }

    /// Receive the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<ProgressEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if (self.filter)(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::Shutdown);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Check if this receiver would accept a given event without consuming it.
    #[must_use]
    pub fn would_receive(&self, event: &ProgressEvent) -> bool {
        (self.filter)(event)
    }
}

/// A lazy, finite sequence of `ProgressEvent`s for a single run (§6
/// `subscribe_progress`). The stream yields items until the underlying
/// broadcast channel closes — which happens once the publishing side drops
/// its last sender, i.e. once the orchestrator calls `shutdown()` after the
/// run reaches a terminal state — or until a lagged receiver is detected,
/// at which point the stream also ends rather than silently skipping
/// history.
struct ProgressStreamState {
    receiver: broadcast::Receiver<ProgressEvent>,
    done: bool,
}

/// Build the lazy finite sequence backing `subscribe_progress`.
#[must_use]
pub fn progress_stream(
    receiver: broadcast::Receiver<ProgressEvent>,
) -> impl Stream<Item = ProgressEvent> + Send + 'static {
    futures::stream::unfold(
        ProgressStreamState {
            receiver,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }
            match state.receiver.recv().await {
                Ok(event) => {
                    if event.status.is_terminal() {
                        state.done = true;
                    }
                    Some((event, state))
                }
                Err(_) => None,
            }
        },
    )
}
