use std::sync::Arc;

use config::shared::{ClusterGenerationConfig, ProvisioningRetryConfig};
use tracing::{Instrument, debug, error, info, warn};

use crate::credentials::{CredentialExtractor, ExtractedCredentials};
use crate::endpoint::EndpointResolver;
use crate::error::{ErrorKind, GenResult};
use crate::installer::Installer;
use crate::k8s::K8sClient;
use crate::naming::with_random_suffix;
use crate::registry::{ClusterRecord, ClusterRegistry};
use crate::retry::{RetryPolicy, retry_with_policy};
use crate::unit::{ProvisioningUnit, UnitPhase};

/// Decisions taken when a provisioning step does not go as planned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionPolicy {
    /// Proceed to credential extraction when the installer reports a failure.
    ///
    /// The installer may fail on an install that actually succeeded, credential extraction is what
    /// decides whether the cluster is usable.
    pub continue_on_install_error: bool,
    /// Register the cluster with an empty server URI when its endpoint could not be resolved,
    /// instead of failing the unit.
    pub degrade_to_unresolved_on_timeout: bool,
    /// Retries of the credential extraction step.
    pub credentials: RetryPolicy,
    /// Retries of the endpoint resolution step.
    pub endpoint: RetryPolicy,
}

impl From<&ProvisioningRetryConfig> for ProvisionPolicy {
    fn from(config: &ProvisioningRetryConfig) -> Self {
        ProvisionPolicy {
            continue_on_install_error: true,
            degrade_to_unresolved_on_timeout: true,
            credentials: RetryPolicy::from(&config.credentials),
            endpoint: RetryPolicy::from(&config.endpoint),
        }
    }
}

impl Default for ProvisionPolicy {
    fn default() -> Self {
        ProvisionPolicy::from(&ProvisioningRetryConfig::default())
    }
}

/// Runs the full provisioning workflow of one cluster.
///
/// Each call to [`UnitProvisioner::provision`] goes through
/// `Installing -> ExtractingCredentials -> ResolvingEndpoint -> Registering` and ends either
/// `Done` or `Failed`. Calls share no state, so a provisioner can serve many units at once.
pub struct UnitProvisioner {
    installer: Arc<dyn Installer>,
    registry: Arc<dyn ClusterRegistry>,
    extractor: CredentialExtractor,
    resolver: EndpointResolver,
    policy: ProvisionPolicy,
    clusters: ClusterGenerationConfig,
}

impl UnitProvisioner {
    pub fn new(
        k8s_client: Arc<dyn K8sClient>,
        installer: Arc<dyn Installer>,
        registry: Arc<dyn ClusterRegistry>,
        policy: ProvisionPolicy,
        clusters: ClusterGenerationConfig,
    ) -> UnitProvisioner {
        UnitProvisioner {
            installer,
            registry,
            extractor: CredentialExtractor::new(k8s_client.clone()),
            resolver: EndpointResolver::new(k8s_client, policy.endpoint.clone()),
            policy,
            clusters,
        }
    }

    /// Provisions the unit with the given 1-based ordinal.
    ///
    /// On failure no cleanup is attempted: whatever got installed is left for the reaper.
    pub async fn provision(&self, index: usize) -> GenResult<()> {
        let unit = ProvisioningUnit::generate(index, &self.clusters.namespace_prefix);
        let span = tracing::info_span!(
            "provisioning_unit",
            unit = index,
            namespace = %unit.namespace,
            release = %unit.release_name()
        );

        async move {
            let mut phase = UnitPhase::Installing;
            let result = self.run(&unit, &mut phase).await;

            match &result {
                Ok(()) => {
                    advance(&mut phase, UnitPhase::Done);
                    info!("cluster provisioned");
                }
                Err(err) => {
                    error!(failed_phase = %phase, error = %err, "cluster provisioning failed");
                    advance(&mut phase, UnitPhase::Failed);
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, unit: &ProvisioningUnit, phase: &mut UnitPhase) -> GenResult<()> {
        self.install(unit).await?;

        advance(phase, UnitPhase::ExtractingCredentials);
        let credentials = self.extract_credentials(unit).await?;

        advance(phase, UnitPhase::ResolvingEndpoint);
        let server = if self.policy.degrade_to_unresolved_on_timeout {
            self.resolver
                .resolve_or_unresolved(&unit.namespace, &unit.release_suffix)
                .await
        } else {
            self.resolver
                .resolve_with_retry(&unit.namespace, &unit.release_suffix)
                .await?
        };

        advance(phase, UnitPhase::Registering);
        self.register(server, credentials).await
    }

    async fn install(&self, unit: &ProvisioningUnit) -> GenResult<()> {
        let result = self
            .installer
            .install(
                &unit.release_name(),
                &unit.namespace,
                &self.clusters.values_file_path,
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.policy.continue_on_install_error => {
                warn!(error = %err, "installer reported a failure, continuing with credential extraction");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn extract_credentials(&self, unit: &ProvisioningUnit) -> GenResult<ExtractedCredentials> {
        retry_with_policy(
            &self.policy.credentials,
            "extract_credentials",
            |_| self.extractor.extract(&unit.namespace, &unit.release_suffix),
            |_| true,
        )
        .await
    }

    async fn register(&self, server: String, credentials: ExtractedCredentials) -> GenResult<()> {
        let record = ClusterRecord::generated(
            server,
            with_random_suffix(&self.clusters.cluster_name_prefix),
            credentials,
            &self.clusters.destination_namespace,
        );

        self.registry
            .create_cluster(&record)
            .await
            .map_err(|err| err.with_kind(ErrorKind::RegistrationFailed))
    }
}

fn advance(phase: &mut UnitPhase, next: UnitPhase) {
    debug_assert!(!phase.is_terminal(), "unit left terminal phase {phase}");
    debug!(from = %phase, to = %next, "unit phase changed");
    *phase = next;
}
