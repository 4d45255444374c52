//! Per-host politeness gating (§4.1).
//!
//! Unlike the token-bucket rate limiter this module's teacher carried
//! (lock-free, `AtomicU128`-packed, tuned for thousands of concurrent
//! crawl workers), a research run fetches at most a handful of hosts at
//! once, so the contract here is simpler: one timestamp per host, guarded
//! by a mutex, enforcing a minimum interval between successive fetches of
//! that host (§5: "`RateLimiter.last[host]`: guarded by a mutex;
//! read-modify-write is atomic").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ResearchError;

const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Enforces a minimum interval between successive fetches of the same host.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Arc<Mutex<HashMap<String, Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(interval_secs.max(0.0)),
            last: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until at least `interval` has elapsed since the last call to
    /// `wait` for this host returned, then record the new timestamp. The
    /// first waiter for a host proceeds immediately.
    ///
    /// # Errors
    /// Returns `ResearchError::Timeout` if `deadline` elapses first, in
    /// which case the host's timestamp is left untouched.
    pub async fn wait(&self, host: &str, deadline: Option<Instant>) -> Result<(), ResearchError> {
        loop {
            let now = Instant::now();
            let sleep_for = {
                let mut guard = self.last.lock().await;
                match guard.get(host) {
                    Some(&last) => {
                        let elapsed = now.saturating_duration_since(last);
                        if elapsed >= self.interval {
                            guard.insert(host.to_string(), now);
                            None
                        } else {
                            Some(self.interval - elapsed)
                        }
                    }
                    None => {
                        guard.insert(host.to_string(), now);
                        None
                    }
                }
            };

            let Some(sleep_for) = sleep_for else {
                return Ok(());
            };

            let wake_at = now + sleep_for;
            if let Some(deadline) = deadline {
                if wake_at > deadline {
                    return Err(ResearchError::Timeout {
                        what: format!("rate limit wait for host {host}"),
                    });
                }
            }
            tokio::time::sleep_until(wake_at).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_wait_does_not_block() {
        let limiter = RateLimiter::new(0.2);
        let start = Instant::now();
        limiter.wait("example.com", None).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_wait_blocks_for_remaining_interval() {
        let limiter = RateLimiter::new(0.1);
        limiter.wait("example.com", None).await.unwrap();
        let start = Instant::now();
        limiter.wait("example.com", None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn distinct_hosts_do_not_contend() {
        let limiter = RateLimiter::new(10.0);
        limiter.wait("a.com", None).await.unwrap();
        let start = Instant::now();
        limiter.wait("b.com", None).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn deadline_elapsing_does_not_update_timestamp() {
        let limiter = RateLimiter::new(1.0);
        limiter.wait("example.com", None).await.unwrap();

        let near_deadline = Instant::now() + Duration::from_millis(10);
        let err = limiter.wait("example.com", Some(near_deadline)).await;
        assert!(err.is_err());

        // The timestamp was not updated by the failed attempt, so a
        // generous deadline right after should still need to wait roughly
        // the original remaining interval rather than starting fresh.
        let start = Instant::now();
        limiter.wait("example.com", None).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(990));
    }
}
