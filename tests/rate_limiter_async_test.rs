//! Tests that the per-host rate limiter behaves correctly in an async
//! context across concurrent callers (§4.1).

use kodegen_tools_citescrape::RateLimiter;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn first_wait_for_a_host_proceeds_immediately() {
    let limiter = RateLimiter::new(60.0);
    let start = Instant::now();
    limiter.wait("example.com", None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn distinct_hosts_do_not_block_each_other() {
    let limiter = RateLimiter::new(60.0);
    limiter.wait("a.example.com", None).await.unwrap();

    let start = Instant::now();
    limiter.wait("b.example.com", None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn second_wait_for_same_host_blocks_until_interval_elapses() {
    let limiter = RateLimiter::new(0.2);
    limiter.wait("example.com", None).await.unwrap();

    let start = Instant::now();
    limiter.wait("example.com", None).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn wait_past_deadline_returns_timeout_without_recording() {
    let limiter = RateLimiter::new(10.0);
    limiter.wait("example.com", None).await.unwrap();

    let deadline = Instant::now() + Duration::from_millis(10);
    let result = limiter.wait("example.com", Some(deadline)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn many_concurrent_waiters_on_distinct_hosts_all_complete() {
    let limiter = RateLimiter::new(30.0);
    let mut handles = Vec::new();

    for i in 0..8 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.wait(&format!("host{i}.example.com"), None).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
