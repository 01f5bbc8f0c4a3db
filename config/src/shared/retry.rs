use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Retry policy configuration for a single retried step.
///
/// `max_attempts` counts the first try, so `max_attempts = 6` means one attempt plus five retries.
/// A `backoff_factor` of `1.0` yields a fixed delay of `initial_delay_ms` between attempts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay, in milliseconds, before the first retry.
    pub initial_delay_ms: u64,

    /// Maximum delay between retries.
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier applied to the delay after each attempt.
    pub backoff_factor: f32,
}

impl RetryConfig {
    /// Builds a retry configuration with a constant delay between attempts.
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            backoff_factor: 1.0,
        }
    }

    pub fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::OutOfRange {
                field,
                reason: "max_attempts must be at least 1".to_string(),
            });
        }

        if self.backoff_factor < 1.0 {
            return Err(ValidationError::OutOfRange {
                field,
                reason: "backoff_factor must be greater than or equal to 1.0".to_string(),
            });
        }

        Ok(())
    }
}
