//! Per-IP tumbling-window rate limiter. A background task wholesale-resets
//! the counter table every 60 seconds rather than expiring entries
//! individually -- coarse but deterministic, matching spec.md §4.3.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

const RESET_INTERVAL: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    counts: RwLock<HashMap<String, u32>>,
    limit: u32,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Arc<Self> {
        Arc::new(Self {
            counts: RwLock::new(HashMap::new()),
            limit,
        })
    }

    /// Increments `ip`'s counter and returns whether the post-increment
    /// count exceeds the configured limit.
    pub async fn check_and_increment(&self, ip: &str) -> bool {
        let mut counts = self.counts.write().await;
        let count = counts.entry(ip.to_string()).or_insert(0);
        *count += 1;
        *count > self.limit
    }

    pub fn spawn_reset_task(self: &Arc<Self>, cancel: CancellationToken) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RESET_INTERVAL);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("rate limit reset task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let mut counts = limiter.counts.write().await;
                        *counts = HashMap::new();
                        tracing::debug!("rate limit table reset");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(2);
        assert!(!limiter.check_and_increment("1.2.3.4").await);
        assert!(!limiter.check_and_increment("1.2.3.4").await);
    }

    #[tokio::test]
    async fn rejects_once_the_limit_is_exceeded() {
        let limiter = RateLimiter::new(2);
        assert!(!limiter.check_and_increment("1.2.3.4").await);
        assert!(!limiter.check_and_increment("1.2.3.4").await);
        assert!(limiter.check_and_increment("1.2.3.4").await);
    }

    #[tokio::test]
    async fn counters_are_independent_per_ip() {
        let limiter = RateLimiter::new(1);
        assert!(!limiter.check_and_increment("1.1.1.1").await);
        assert!(!limiter.check_and_increment("2.2.2.2").await);
    }
}
