//! Error types for progress event bus operations.

/// Error types for event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("failed to publish event: {0}")]
    PublishFailed(String),

    #[error("no active subscribers")]
    NoSubscribers,

    #[error("receiver lagged behind, missed {0} messages")]
    ReceiverLagged(u64),

    #[error("event bus shutdown")]
    Shutdown,

    #[error("event channel is full (capacity exceeded)")]
    ChannelFull,

    #[error("publish timed out waiting for channel capacity")]
    PublishTimeout,
}
