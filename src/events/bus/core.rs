//! Core ProgressEventBus struct definition and constructors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use tokio::sync::{Notify, broadcast};

use crate::events::config::EventBusConfig;
use crate::events::metrics::EventBusMetrics;
use crate::events::types::ProgressEvent;

/// Per-run event bus for publishing and subscribing to progress updates
/// (§4.8, §6 `subscribe_progress`). One instance is created per research
/// run; subscribers receive a lazy finite sequence that ends once the
/// orchestrator signals shutdown after the run reaches a terminal state.
#[derive(Debug)]
pub struct ProgressEventBus {
    pub(super) sender: broadcast::Sender<ProgressEvent>,
    pub(super) config: Arc<EventBusConfig>,
    pub(super) metrics: EventBusMetrics,
    pub(super) shutdown: Arc<Notify>,
    pub(super) shutdown_flag: Arc<AtomicBool>,
    pub(super) num_instances: Arc<AtomicUsize>,
}

impl ProgressEventBus {
    /// Create a new event bus with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let config = EventBusConfig {
            capacity,
            ..Default::default()
        };
        Self::with_config(config)
    }

    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            sender,
            config: Arc::new(config),
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            num_instances: Arc::new(AtomicUsize::new(1)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Current channel pressure, 0.0 (empty) to 1.0+ (at/over capacity).
    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.sender.len() as f64 / self.config.capacity.max(1) as f64
    }

    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.pressure() >= self.config.overload_threshold
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.sender.len()
    }
}
