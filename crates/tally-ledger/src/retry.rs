//! # Retry
//!
//! Re-runs a whole operation when it lost a write race.
//!
//! Every engine operation is one SQLite transaction; a transaction that
//! failed on `SQLITE_BUSY` rolled back completely, so running it again from
//! the top is safe.
//!
//! ```text
//! attempt 1 ── Busy ──► sleep 50ms
//! attempt 2 ── Busy ──► sleep 100ms
//! attempt 3 ── Busy ──► sleep 200ms (capped at max_backoff)
//! attempt 4 ── Busy ──► ConcurrencyConflict { operation }
//! ```

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// How often and how patiently a conflicted operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. 0 disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `operation` until it succeeds, fails for a non-retryable
    /// reason, or runs out of retries.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> LedgerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_retries {
                        warn!(
                            operation = name,
                            attempts = attempt + 1,
                            "Giving up after write conflicts"
                        );
                        return Err(LedgerError::conflict(name));
                    }
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
                    debug!(operation = name, attempt, ?delay, "Write conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
