//! Per-engine adapter contract and the shared retry helper all engines use.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::model::Hit;

/// One search engine adapter. `search` never fails outward: per-engine
/// errors are logged and degrade to an empty result (§4.4: "Failures are
/// logged and return an empty list; they do not fail the aggregate").
#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Vec<Hit>;
}

/// Retry `attempt` up to `max_attempts` times with exponential backoff
/// (base 1s, factor 2, capped at 10s) plus jitter, per §4.4's per-engine
/// contract. Returns the last error if every attempt fails.
pub async fn retry_with_backoff<F, Fut, T, E>(max_attempts: u32, attempt: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    const BASE: Duration = Duration::from_secs(1);
    const CAP: Duration = Duration::from_secs(10);

    let mut last_err = None;
    for n in 0..max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if n + 1 < max_attempts {
                    let backoff = (BASE * 2u32.pow(n)).min(CAP);
                    let jitter_ms = rand::rng().random_range(0..250);
                    log::warn!(
                        "search attempt {}/{} failed: {err}; retrying in {:?}",
                        n + 1,
                        max_attempts,
                        backoff
                    );
                    tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
                }
                last_err = Some(err);
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
