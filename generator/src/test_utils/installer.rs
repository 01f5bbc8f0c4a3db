use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::installer::{Installer, InstallerError};
use crate::test_utils::gauge::ConcurrencyGauge;

/// An install requested through [`Installer::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCall {
    pub release_name: String,
    pub namespace: String,
    pub values_file_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstallOutcome {
    Succeed,
    Fail,
    Panic,
}

/// [`Installer`] recording installs instead of running them.
#[derive(Debug)]
pub struct MockInstaller {
    outcome: InstallOutcome,
    delay: Duration,
    calls: Mutex<Vec<InstallCall>>,
    gauge: ConcurrencyGauge,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::with_outcome(InstallOutcome::Succeed)
    }

    /// An installer whose every install reports a failure.
    pub fn failing() -> Self {
        Self::with_outcome(InstallOutcome::Fail)
    }

    /// An installer panicking on every install.
    pub fn panicking() -> Self {
        Self::with_outcome(InstallOutcome::Panic)
    }

    fn with_outcome(outcome: InstallOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: Mutex::new(vec![]),
            gauge: ConcurrencyGauge::default(),
        }
    }

    /// Makes every install take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<InstallCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of installs that were in flight at the same time.
    pub fn max_concurrent_installs(&self) -> usize {
        self.gauge.high_water_mark()
    }
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Installer for MockInstaller {
    async fn install(
        &self,
        release_name: &str,
        namespace: &str,
        values_file_path: &str,
    ) -> Result<(), InstallerError> {
        let _guard = self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.calls.lock().unwrap().push(InstallCall {
            release_name: release_name.to_string(),
            namespace: namespace.to_string(),
            values_file_path: values_file_path.to_string(),
        });

        match self.outcome {
            InstallOutcome::Succeed => Ok(()),
            InstallOutcome::Fail => Err(InstallerError::Failed {
                release: release_name.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "timed out waiting for the condition".to_string(),
            }),
            InstallOutcome::Panic => panic!("installer crashed while installing {release_name}"),
        }
    }
}
