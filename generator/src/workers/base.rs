use std::fmt;

use crate::error::GenError;

/// A unit of a batch that ended in the `Failed` phase.
#[derive(Debug, Clone)]
pub struct UnitFailure {
    /// 1-based ordinal of the unit within its batch.
    pub index: usize,
    pub error: GenError,
}

/// Outcome of a whole batch.
///
/// Unit failures never abort the batch, they are only collected here.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failures: Vec<UnitFailure>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns `true` when every requested unit was provisioned.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.requested && self.failures.is_empty()
    }

    /// Aggregates the unit failures into a single error, or [`None`] when there are none.
    pub fn into_error(self) -> Option<GenError> {
        if self.failures.is_empty() {
            return None;
        }

        let errors = self.failures.into_iter().map(|failure| failure.error).collect();
        Some(GenError::many(errors))
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} clusters provisioned, {} failed",
            self.succeeded,
            self.requested,
            self.failed()
        )
    }
}
