//! Event bus implementation for publishing and subscribing to progress events.

mod core;

mod impls;
mod metrics_reporting;
mod publishing;
mod shutdown;
mod subscription;

pub use core::ProgressEventBus;
