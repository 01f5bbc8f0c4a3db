use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ErrorKind, GenResult};
use crate::registry::{ClusterRecord, ClusterRegistry};
use crate::test_utils::gauge::ConcurrencyGauge;

/// [`ClusterRegistry`] keeping records in memory.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: Mutex<Vec<ClusterRecord>>,
    attempts: Mutex<usize>,
    failing: bool,
    delay: Duration,
    gauge: ConcurrencyGauge,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry rejecting every record.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Makes every registration take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn records(&self) -> Vec<ClusterRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of `create_cluster` calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Highest number of registrations that were in flight at the same time.
    pub fn max_concurrent_registrations(&self) -> usize {
        self.gauge.high_water_mark()
    }
}

#[async_trait]
impl ClusterRegistry for MemoryRegistry {
    async fn create_cluster(&self, record: &ClusterRecord) -> GenResult<()> {
        let _guard = self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        *self.attempts.lock().unwrap() += 1;

        if self.failing {
            crate::bail!(
                ErrorKind::RegistrationFailed,
                "Cluster record was rejected",
                record.name
            );
        }

        self.records.lock().unwrap().push(record.clone());

        Ok(())
    }
}
