//! Configuration for the per-run progress event bus.

/// Configuration for a `ProgressEventBus`. Delivery is always best-effort
/// (§4.8): publishers never block on a slow or absent subscriber, so there
/// is no backpressure mode to configure — only capacity and metrics.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of buffered events before the broadcast channel
    /// starts dropping the oldest ones for lagging subscribers.
    pub capacity: usize,

    /// Pressure threshold (0.0-1.0) for `is_overloaded()`.
    pub overload_threshold: f64,

    /// Whether to track publish/drop/subscriber metrics.
    pub enable_metrics: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            overload_threshold: 0.8,
            enable_metrics: true,
        }
    }
}
