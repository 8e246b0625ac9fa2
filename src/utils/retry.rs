//! Bounded retry with a fixed backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds
    #[serde(default = "defaults::backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_ms: defaults::backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// Returns `None` once every attempt failed; each failure is logged with
    /// `label` for context.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    log::warn!(
                        "{} attempt {}/{} failed: {}",
                        label,
                        attempt,
                        self.max_attempts.max(1),
                        e
                    );
                    if !self.should_retry(attempt) {
                        return None;
                    }
                    tokio::time::sleep(self.backoff()).await;
                }
            }
        }
    }
}

mod defaults {
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff_ms() -> u64 {
        1000
    }
}
