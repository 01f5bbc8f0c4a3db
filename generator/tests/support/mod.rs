#![allow(dead_code)]

use std::sync::Arc;

use config::shared::{ClusterGenerationConfig, GenerateOptions, ProvisioningRetryConfig};
use generator::cluster::ClusterGenerator;
use generator::provisioner::{ProvisionPolicy, UnitProvisioner};
use generator::test_utils::installer::MockInstaller;
use generator::test_utils::k8s::MockK8sClient;
use generator::test_utils::registry::MemoryRegistry;

pub const CONTROL_NAMESPACE: &str = "argocd";

pub fn cluster_config(samples: usize, concurrency: usize) -> ClusterGenerationConfig {
    ClusterGenerationConfig {
        samples,
        concurrency,
        namespace_prefix: "vcluster".to_string(),
        cluster_name_prefix: "cluster".to_string(),
        destination_namespace: "default".to_string(),
        values_file_path: "/tmp/vcluster-values.yaml".to_string(),
        strict: false,
    }
}

pub fn generate_options(samples: usize, concurrency: usize) -> GenerateOptions {
    GenerateOptions {
        namespace: CONTROL_NAMESPACE.to_string(),
        clusters: cluster_config(samples, concurrency),
        retry: ProvisioningRetryConfig::default(),
    }
}

/// Collaborators of a generator, kept around so tests can inspect them.
pub struct Harness {
    pub k8s_client: Arc<MockK8sClient>,
    pub installer: Arc<MockInstaller>,
    pub registry: Arc<MemoryRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockK8sClient::new(), MockInstaller::new(), MemoryRegistry::new())
    }

    pub fn with(
        k8s_client: MockK8sClient,
        installer: MockInstaller,
        registry: MemoryRegistry,
    ) -> Self {
        Self {
            k8s_client: Arc::new(k8s_client),
            installer: Arc::new(installer),
            registry: Arc::new(registry),
        }
    }

    pub fn generator(&self) -> ClusterGenerator {
        ClusterGenerator::new(
            self.k8s_client.clone(),
            self.installer.clone(),
            self.registry.clone(),
        )
    }

    pub fn provisioner(&self, policy: ProvisionPolicy) -> UnitProvisioner {
        UnitProvisioner::new(
            self.k8s_client.clone(),
            self.installer.clone(),
            self.registry.clone(),
            policy,
            cluster_config(1, 1),
        )
    }
}
