//! Retry policies for steps polling a freshly installed cluster.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use config::shared::RetryConfig;
use tracing::warn;

/// How often, and how patiently, an operation is retried.
///
/// `max_attempts` includes the first attempt. Delays start at `initial_delay` and are multiplied by
/// `backoff_factor` after each retry, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Retries up to `max_attempts` times in total, waiting `delay` between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);

        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.initial_delay_ms)),
            backoff_factor: f64::from(config.backoff_factor).max(1.0),
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable` rejects, or the policy is
/// exhausted.
///
/// The operation receives the 1-based attempt number. Between attempts the task sleeps on the Tokio
/// timer, so tests running on a paused clock observe the delays without waiting for them.
pub async fn retry_with_policy<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;

    loop {
        let err = match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };

        if attempt >= policy.max_attempts || !is_retryable(&err) {
            return Err(err);
        }

        let delay = policy.delay_after_attempt(attempt);
        warn!(
            operation = operation_name,
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "operation failed, retrying"
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn fixed_policy_has_constant_delay() {
        let policy = RetryPolicy::fixed(6, Duration::from_secs(10));

        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay_after_attempt(1), Duration::from_secs(10));
        assert_eq!(policy.delay_after_attempt(5), Duration::from_secs(10));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 1_500,
            backoff_factor: 2.0,
        });

        assert_eq!(policy.delay_after_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(1_500));
        assert_eq!(policy.delay_after_attempt(4), Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(6, Duration::from_secs(10));
        let start = Instant::now();

        let result: Result<(), String> = retry_with_policy(
            &policy,
            "always_fails",
            |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("nope".to_string())
                }
            },
            |_| true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        // Five waits between six attempts, none after the last one.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(50) && elapsed < Duration::from_secs(51));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_failures() {
        let policy = RetryPolicy::fixed(10, Duration::from_secs(10));

        let result: Result<u32, String> = retry_with_policy(
            &policy,
            "eventually_succeeds",
            |attempt| async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok(attempt)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_non_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(10, Duration::from_secs(10));

        let result: Result<(), String> = retry_with_policy(
            &policy,
            "fatal",
            |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
            |err| err != "fatal",
        )
        .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
