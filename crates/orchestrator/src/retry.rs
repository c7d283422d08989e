//! Transient-failure retry with linear backoff.

use std::future::Future;
use std::time::Duration;

use store::StoreError;

/// Retry budget for a single remote write or read.
///
/// A transient failure is retried until `max_attempts` calls have been made,
/// sleeping `backoff_base × attempt` after each failed attempt. Non-transient
/// errors are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Base backoff; attempt `n` sleeps `n × backoff_base`.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay applied after the given (1-based) attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    /// Runs `call` under this policy, retrying transient errors.
    pub async fn run<T, F, Fut>(&self, step: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() => {
                    tracing::warn!(step, attempt, %error, "transient failure");
                    tokio::time::sleep(self.backoff_for(attempt)).await;
                    if attempt >= self.max_attempts {
                        tracing::warn!(step, attempts = attempt, "retry budget exhausted");
                        return Err(error);
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}
