//! Progress-reporting system for research runs.
//!
//! This module provides a per-run event bus for publishing and subscribing
//! to `ProgressEvent`s (§4.8), with metrics and filtered subscriptions.

pub mod bus;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod streaming;
pub mod types;

pub use bus::ProgressEventBus;
pub use config::EventBusConfig;
pub use errors::EventBusError;
pub use metrics::EventBusMetrics;
pub use streaming::FilteredReceiver;
pub use types::{BatchPublishResult, ProgressEvent, ShutdownReason};
