//! Minimum spacing between requests to one site.

use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};

/// Enforces a minimum interval between successive [`acquire`](Self::acquire)
/// calls on the same instance.
///
/// Backed by a GCRA limiter with a burst of one, so concurrent callers are
/// released one interval apart rather than together.
pub struct RateLimiter {
    interval: Duration,
    /// `None` when the interval is zero
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiter: Quota::with_period(interval).map(governor::RateLimiter::direct),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous call.
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        if limiter.check().is_err() {
            log::debug!("Rate limit: waiting up to {:?} before next search", self.interval);
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(200);
    /// Clock granularity slack between the limiter and `Instant`
    const SLACK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(limiter.interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_sequential_acquires_are_spaced() {
        let limiter = RateLimiter::new(INTERVAL);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() + SLACK >= INTERVAL);
    }

    #[tokio::test]
    async fn test_elapsed_time_counts_toward_interval() {
        let limiter = RateLimiter::new(INTERVAL);
        limiter.acquire().await;
        tokio::time::sleep(INTERVAL + Duration::from_millis(50)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(INTERVAL));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(start.elapsed() + SLACK >= INTERVAL * 2);
    }
}
