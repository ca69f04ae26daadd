//! Retry with exponential backoff under a hard wall-clock budget

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total wall-clock budget across all attempts and backoff sleeps
    pub timeout: Duration,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Delay before the retry following attempt `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .max(1.0)
            .powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Classification of a single failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    /// Transient failure; the loop may try again
    Retryable(E),
    /// Terminal failure; the loop stops immediately
    NonRetryable(E),
}

/// Why a retry loop gave up
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// A non-retryable error was returned
    Aborted(E),
    /// The budget ran out; `last` holds the most recent retryable error, if one was observed
    TimedOut {
        elapsed: Duration,
        attempts: u32,
        last: Option<E>,
    },
}

/// Run `operation` until it succeeds, fails non-retryably, or the budget is spent.
///
/// An attempt still in flight when the deadline passes is dropped.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, RetryFailure<E>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let start = Instant::now();
    let deadline = start + config.timeout;
    let mut attempts: u32 = 0;
    let mut last = None;

    loop {
        if attempts > 0 && Instant::now() >= deadline {
            return Err(RetryFailure::TimedOut {
                elapsed: start.elapsed(),
                attempts,
                last,
            });
        }
        attempts += 1;

        match tokio::time::timeout_at(deadline, operation()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(RetryError::NonRetryable(err))) => return Err(RetryFailure::Aborted(err)),
            Ok(Err(RetryError::Retryable(err))) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let delay = config.delay_for_attempt(attempts - 1).min(remaining);
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable failure: {}",
                    err
                );
                last = Some(err);
                tokio::time::sleep(delay).await;
            }
            Err(_) => {
                return Err(RetryFailure::TimedOut {
                    elapsed: start.elapsed(),
                    attempts,
                    last,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            timeout: Duration::from_secs(60),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(10)); // capped at max
        assert_eq!(config.delay_for_attempt(1000), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<&str, RetryFailure<String>> =
            retry(&RetryConfig::default(), || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(RetryError::Retryable("not yet".to_string()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_aborts_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), RetryFailure<String>> = retry(&RetryConfig::default(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::NonRetryable("denied".to_string()))
            }
        })
        .await;

        match result {
            Err(RetryFailure::Aborted(e)) => assert_eq!(e, "denied"),
            other => panic!("Expected Aborted, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_respected() {
        let config = RetryConfig::with_timeout(Duration::from_secs(60));
        let start = Instant::now();

        let result: Result<(), RetryFailure<String>> = retry(&config, || async {
            Err(RetryError::Retryable("still propagating".to_string()))
        })
        .await;

        match result {
            Err(RetryFailure::TimedOut { attempts, last, .. }) => {
                assert!(attempts > 1);
                assert_eq!(last.as_deref(), Some("still propagating"));
            }
            other => panic!("Expected TimedOut, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_is_abandoned_at_deadline() {
        let config = RetryConfig::with_timeout(Duration::from_secs(5));

        let result: Result<(), RetryFailure<String>> = retry(&config, || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;

        match result {
            Err(RetryFailure::TimedOut { attempts, last, .. }) => {
                assert_eq!(attempts, 1);
                assert!(last.is_none());
            }
            other => panic!("Expected TimedOut, got {:?}", other),
        }
    }
}
