use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod, Secret};
use kube::Client;
use kube::api::{Api, AttachParams, DeleteParams, ListParams, PostParams};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::k8s::{ExecOutput, K8sClient, K8sError};

/// Status reported by the API server when a remote command exits unsuccessfully.
const EXEC_FAILURE_STATUS: &str = "Failure";

/// [`K8sClient`] backed by the [`kube`] crate.
///
/// Talks to the cluster selected by the ambient configuration: the in-cluster service account
/// when running in a pod, `~/.kube/config` otherwise.
#[derive(Clone)]
pub struct HttpK8sClient {
    client: Client,
}

impl HttpK8sClient {
    pub async fn new() -> Result<HttpK8sClient, K8sError> {
        let client = Client::try_default().await?;

        Ok(HttpK8sClient { client })
    }
}

async fn read_stream<R>(reader: Option<R>) -> Result<Vec<u8>, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }

    Ok(buf)
}

#[async_trait]
impl K8sClient for HttpK8sClient {
    async fn exec_in_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        command: &[&str],
    ) -> Result<ExecOutput, K8sError> {
        debug!(namespace, pod_name, container, ?command, "executing command in pod");

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = AttachParams::default()
            .container(container)
            .stdout(true)
            .stderr(true);
        let mut attached = pods.exec(pod_name, command.to_vec(), &params).await?;

        let status = attached.take_status();
        let stdout = attached.stdout();
        let stderr = attached.stderr();
        // Both streams are drained together so a chatty stderr cannot stall stdout.
        let (stdout, stderr) = tokio::try_join!(read_stream(stdout), read_stream(stderr))?;

        if let Some(status) = status
            && let Some(status) = status.await
            && status.status.as_deref() == Some(EXEC_FAILURE_STATUS)
        {
            return Err(K8sError::Exec(status.message.unwrap_or_else(|| {
                String::from_utf8_lossy(&stderr).into_owned()
            })));
        }

        attached
            .join()
            .await
            .map_err(|err| K8sError::Exec(err.to_string()))?;

        Ok(ExecOutput { stdout, stderr })
    }

    async fn get_pod_ip(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<Option<String>, K8sError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods.get(pod_name).await?;

        Ok(pod
            .status
            .and_then(|status| status.pod_ip)
            .filter(|ip| !ip.is_empty()))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, K8sError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|namespace| namespace.metadata.name)
            .collect())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), K8sError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), K8sError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        secrets.create(&PostParams::default(), secret).await?;

        Ok(())
    }

    async fn delete_secrets_by_label(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<(), K8sError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        secrets
            .delete_collection(
                &DeleteParams::default(),
                &ListParams::default().labels(label_selector),
            )
            .await?;

        Ok(())
    }
}
