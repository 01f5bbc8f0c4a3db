use std::sync::Arc;

use async_trait::async_trait;
use config::shared::GenerateOptions;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, GenResult};
use crate::installer::Installer;
use crate::k8s::K8sClient;
use crate::provisioner::{ProvisionPolicy, UnitProvisioner};
use crate::reaper::Reaper;
use crate::registry::ClusterRegistry;
use crate::workers::base::BatchSummary;
use crate::workers::pool::BatchOrchestrator;

/// Entry points of a resource generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Creates the resources described by `options`.
    async fn generate(&self, options: &GenerateOptions) -> GenResult<BatchSummary>;

    /// Deletes every resource previously created by the generator.
    async fn clean(&self, options: &GenerateOptions) -> GenResult<()>;
}

/// Generator of ephemeral virtual clusters registered as deployment targets.
pub struct ClusterGenerator {
    k8s_client: Arc<dyn K8sClient>,
    installer: Arc<dyn Installer>,
    registry: Arc<dyn ClusterRegistry>,
    policy_override: Option<ProvisionPolicy>,
}

impl ClusterGenerator {
    pub fn new(
        k8s_client: Arc<dyn K8sClient>,
        installer: Arc<dyn Installer>,
        registry: Arc<dyn ClusterRegistry>,
    ) -> ClusterGenerator {
        ClusterGenerator {
            k8s_client,
            installer,
            registry,
            policy_override: None,
        }
    }

    /// Uses `policy` instead of the one derived from the retry options of each call.
    pub fn with_policy(mut self, policy: ProvisionPolicy) -> ClusterGenerator {
        self.policy_override = Some(policy);
        self
    }

    fn policy(&self, options: &GenerateOptions) -> ProvisionPolicy {
        self.policy_override
            .clone()
            .unwrap_or_else(|| ProvisionPolicy::from(&options.retry))
    }
}

#[async_trait]
impl Generator for ClusterGenerator {
    async fn generate(&self, options: &GenerateOptions) -> GenResult<BatchSummary> {
        options.validate()?;

        let clusters = &options.clusters;
        info!(
            samples = clusters.samples,
            concurrency = clusters.concurrency,
            namespace_prefix = clusters.namespace_prefix,
            values_file_path = clusters.values_file_path,
            "generating clusters"
        );

        let provisioner = UnitProvisioner::new(
            self.k8s_client.clone(),
            self.installer.clone(),
            self.registry.clone(),
            self.policy(options),
            clusters.clone(),
        );
        let orchestrator = BatchOrchestrator::new(Arc::new(provisioner), clusters.concurrency);
        let summary = orchestrator.run(clusters.samples).await;

        for failure in &summary.failures {
            warn!(unit = failure.index, error = %failure.error, "cluster was not generated");
        }
        info!(
            requested = summary.requested,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            "cluster generation finished"
        );

        if clusters.strict
            && let Some(err) = summary.clone().into_error()
        {
            error!(failed = summary.failed(), "strict mode enabled, failing the batch");
            return Err(err);
        }

        Ok(summary)
    }

    async fn clean(&self, options: &GenerateOptions) -> GenResult<()> {
        if options.namespace.is_empty() {
            crate::bail!(
                ErrorKind::ConfigError,
                "Invalid generate options",
                "namespace must not be empty"
            );
        }

        info!(namespace = options.namespace, "cleaning generated clusters");
        let report = Reaper::new(self.k8s_client.clone())
            .clean(&options.namespace)
            .await?;

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "cleanup finished"
        );

        Ok(())
    }
}
