//! Standard trait implementations for `ProgressEventBus`.

use std::sync::atomic::Ordering;

use crate::events::config::EventBusConfig;

use super::core::ProgressEventBus;

impl Default for ProgressEventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

impl Clone for ProgressEventBus {
    fn clone(&self) -> Self {
        self.num_instances.fetch_add(1, Ordering::Relaxed);
        Self {
            sender: self.sender.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone(),
            shutdown_flag: self.shutdown_flag.clone(),
            num_instances: self.num_instances.clone(),
        }
    }
}

impl Drop for ProgressEventBus {
    fn drop(&mut self) {
        if 1 == self.num_instances.fetch_sub(1, Ordering::AcqRel) {
            self.shutdown_flag.store(true, Ordering::SeqCst);
            self.shutdown.notify_waiters();
            log::trace!("progress event bus dropped (last instance), shutdown signalled");
        }
    }
}
