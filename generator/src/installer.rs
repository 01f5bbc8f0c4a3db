use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Chart deploying an ephemeral virtual cluster.
pub const VCLUSTER_CHART: ChartCoordinates = ChartCoordinates {
    name: "vcluster",
    repo: "https://charts.loft.sh",
};

/// Errors reported by an [`Installer`].
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("failed to run `{binary}`: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("install of release `{release}` exited with status {status}: {stderr}")]
    Failed {
        release: String,
        status: String,
        stderr: String,
    },
}

/// Location of a chart in a chart repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartCoordinates {
    pub name: &'static str,
    pub repo: &'static str,
}

/// Deploys the workload of a cluster into a namespace.
///
/// The namespace is created when missing and the call returns once the workload is ready, or the
/// installer gave up waiting.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(
        &self,
        release_name: &str,
        namespace: &str,
        values_file_path: &str,
    ) -> Result<(), InstallerError>;
}

/// [`Installer`] shelling out to the `helm` CLI.
#[derive(Debug, Clone)]
pub struct HelmInstaller {
    binary: String,
    chart: ChartCoordinates,
}

impl HelmInstaller {
    pub fn new(binary: impl Into<String>, chart: ChartCoordinates) -> HelmInstaller {
        HelmInstaller {
            binary: binary.into(),
            chart,
        }
    }

    /// Arguments of an idempotent `helm upgrade --install` of the chart.
    ///
    /// The repository config is blanked so installs never depend on repos configured locally.
    pub fn install_args(
        &self,
        release_name: &str,
        namespace: &str,
        values_file_path: &str,
    ) -> Vec<String> {
        [
            "upgrade",
            "--install",
            release_name,
            self.chart.name,
            "--values",
            values_file_path,
            "--repo",
            self.chart.repo,
            "--namespace",
            namespace,
            "--repository-config",
            "",
            "--create-namespace",
            "--wait",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

impl Default for HelmInstaller {
    fn default() -> Self {
        HelmInstaller::new("helm", VCLUSTER_CHART)
    }
}

#[async_trait]
impl Installer for HelmInstaller {
    async fn install(
        &self,
        release_name: &str,
        namespace: &str,
        values_file_path: &str,
    ) -> Result<(), InstallerError> {
        let args = self.install_args(release_name, namespace, values_file_path);
        info!(release_name, namespace, "installing cluster release");
        debug!(binary = self.binary, ?args, "running installer");

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| InstallerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(InstallerError::Failed {
                release: release_name.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_args_target_release_and_namespace() {
        let installer = HelmInstaller::default();

        let args = installer.install_args("vcluster-abcde", "vcluster-fghij", "/tmp/values.yaml");

        assert_eq!(
            args,
            vec![
                "upgrade",
                "--install",
                "vcluster-abcde",
                "vcluster",
                "--values",
                "/tmp/values.yaml",
                "--repo",
                "https://charts.loft.sh",
                "--namespace",
                "vcluster-fghij",
                "--repository-config",
                "",
                "--create-namespace",
                "--wait",
            ]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let installer = HelmInstaller::new("helm-binary-that-does-not-exist", VCLUSTER_CHART);

        let err = installer
            .install("vcluster-abcde", "vcluster-fghij", "/tmp/values.yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, InstallerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let installer = HelmInstaller::new("false", VCLUSTER_CHART);

        let err = installer
            .install("vcluster-abcde", "vcluster-fghij", "/tmp/values.yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, InstallerError::Failed { .. }));
    }
}
