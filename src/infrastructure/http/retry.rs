use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::ServiceError;
use crate::domain::models::RetryConfig;

/// Bounded exponential backoff for adapter calls.
///
/// Only transient errors ([`ServiceError::is_transient`]) are retried, at
/// most `max_retries` times after the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::from_millis(1), Duration::from_millis(1))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build();

        let max_retries = self.max_retries;
        let mut attempt = 0u32;
        retry(policy, || {
            attempt += 1;
            let current = attempt;
            let call = operation();
            async move {
                call.await.map_err(|err| {
                    if err.is_transient() && current <= max_retries {
                        warn!(attempt = current, error = %err, "Transient error, retrying");
                        backoff::Error::transient(err)
                    } else {
                        debug!(attempt = current, error = %err, "Giving up");
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}
