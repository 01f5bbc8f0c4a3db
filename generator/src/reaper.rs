use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ErrorKind, GenError, GenResult};
use crate::k8s::K8sClient;
use crate::registry::GENERATED_BY_LABEL_SELECTOR;
use crate::unit::WORKLOAD_NAME_PREFIX;

/// Outcome of the namespace sweep of a [`Reaper::clean`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Deletes everything the generator created, based on naming and labeling conventions only.
///
/// No provisioning state is consulted: a namespace is generated when its name carries the workload
/// prefix, a secret is generated when it carries the generated-by label. Running the reaper twice
/// is harmless.
#[derive(Clone)]
pub struct Reaper {
    k8s_client: Arc<dyn K8sClient>,
}

impl Reaper {
    pub fn new(k8s_client: Arc<dyn K8sClient>) -> Reaper {
        Reaper { k8s_client }
    }

    /// Deletes generated namespaces, then the generated secrets of `control_namespace`.
    ///
    /// Namespace failures are logged and skipped. The error of the secret deletion is returned.
    pub async fn clean(&self, control_namespace: &str) -> GenResult<SweepReport> {
        let report = match self.sweep_namespaces().await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "could not list namespaces, skipping namespace cleanup");
                SweepReport::default()
            }
        };

        self.k8s_client
            .delete_secrets_by_label(control_namespace, GENERATED_BY_LABEL_SELECTOR)
            .await
            .map_err(|err| GenError::from(err).with_kind(ErrorKind::DeleteFailed))?;

        info!(
            namespace = control_namespace,
            selector = GENERATED_BY_LABEL_SELECTOR,
            "deleted generated cluster secrets"
        );

        Ok(report)
    }

    /// Deletes every namespace whose name starts with the workload prefix.
    pub async fn sweep_namespaces(&self) -> GenResult<SweepReport> {
        let namespaces = self
            .k8s_client
            .list_namespaces()
            .await
            .map_err(|err| GenError::from(err).with_kind(ErrorKind::ListFailed))?;

        let mut report = SweepReport::default();
        for namespace in namespaces
            .into_iter()
            .filter(|namespace| namespace.starts_with(WORKLOAD_NAME_PREFIX))
        {
            match self.k8s_client.delete_namespace(&namespace).await {
                Ok(()) => {
                    info!(namespace, "deleted generated namespace");
                    report.deleted.push(namespace);
                }
                Err(err) => {
                    warn!(namespace, error = %err, "failed to delete generated namespace");
                    report.failed.push(namespace);
                }
            }
        }

        Ok(report)
    }
}
