use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

/// Errors emitted by the Kubernetes integration.
#[derive(Debug, Error)]
pub enum K8sError {
    /// An error returned by the [`kube`] client when talking to the API server.
    #[error("An error occurred with kube when dealing with K8s: {0}")]
    Kube(#[from] kube::Error),
    /// The remote command could not be run to completion inside the pod.
    #[error("The remote command failed: {0}")]
    Exec(String),
    /// Reading the output streams of a remote command failed.
    #[error("An io error occurred while reading remote command output: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of a command executed inside a pod.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Client interface describing the Kubernetes operations used by the generator.
///
/// Implementations must be safe to call from many provisioning units at once.
#[async_trait]
pub trait K8sClient: Send + Sync {
    /// Runs `command` inside `container` of the given pod and collects its output.
    ///
    /// Fails when the exec stream cannot be opened, breaks, or the command reports failure.
    async fn exec_in_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        command: &[&str],
    ) -> Result<ExecOutput, K8sError>;

    /// Returns the IP assigned to a pod, or [`None`] while no IP is assigned yet.
    ///
    /// A missing pod is reported as an error.
    async fn get_pod_ip(&self, namespace: &str, pod_name: &str)
    -> Result<Option<String>, K8sError>;

    /// Lists the names of all namespaces of the cluster.
    async fn list_namespaces(&self) -> Result<Vec<String>, K8sError>;

    /// Deletes a namespace and everything it contains.
    async fn delete_namespace(&self, name: &str) -> Result<(), K8sError>;

    /// Creates a secret in `namespace`. An already existing secret is an error.
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), K8sError>;

    /// Deletes every secret of `namespace` matching `label_selector` with a single request.
    async fn delete_secrets_by_label(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<(), K8sError>;
}
