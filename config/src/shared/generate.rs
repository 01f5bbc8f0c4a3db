use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{RetryConfig, ValidationError};

/// Delay between credential extraction and endpoint resolution attempts.
const PROVISIONING_RETRY_DELAY_MS: u64 = 10_000;

/// Attempts made to extract credentials from a freshly installed cluster: one try plus five retries.
const CREDENTIALS_MAX_ATTEMPTS: u32 = 6;

/// Attempts made to read the address of a freshly installed cluster.
const ENDPOINT_MAX_ATTEMPTS: u32 = 10;

/// Options of a single `generate` or `clean` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateOptions {
    /// Control namespace where cluster records are stored as secrets.
    pub namespace: String,
    /// Parameters of the cluster batch.
    pub clusters: ClusterGenerationConfig,
    /// Retry policies of the provisioning steps.
    #[serde(default)]
    pub retry: ProvisioningRetryConfig,
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.namespace.is_empty() {
            return Err(ValidationError::Empty("namespace"));
        }

        self.clusters.validate()?;
        self.retry.validate()
    }
}

impl Config for GenerateOptions {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

/// Parameters describing the batch of ephemeral clusters to provision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClusterGenerationConfig {
    /// Number of clusters to create.
    pub samples: usize,
    /// Maximum number of clusters provisioned at the same time.
    pub concurrency: usize,
    /// Prefix of the namespace each cluster is installed into.
    pub namespace_prefix: String,
    /// Prefix of the display name under which a cluster is registered.
    pub cluster_name_prefix: String,
    /// Namespace allowed as deployment destination on every registered cluster.
    pub destination_namespace: String,
    /// Values file handed to the installer.
    pub values_file_path: String,
    /// When set, `generate` fails if any cluster of the batch failed.
    #[serde(default)]
    pub strict: bool,
}

impl ClusterGenerationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.concurrency == 0 {
            return Err(ValidationError::OutOfRange {
                field: "clusters.concurrency",
                reason: "at least one cluster must be allowed in flight".to_string(),
            });
        }

        let required = [
            ("clusters.namespace_prefix", &self.namespace_prefix),
            ("clusters.cluster_name_prefix", &self.cluster_name_prefix),
            ("clusters.destination_namespace", &self.destination_namespace),
            ("clusters.values_file_path", &self.values_file_path),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ValidationError::Empty(field));
            }
        }

        Ok(())
    }
}

/// Retry policies of the steps that poll a freshly installed cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvisioningRetryConfig {
    /// Policy of the credential extraction step.
    pub credentials: RetryConfig,
    /// Policy of the endpoint resolution step.
    pub endpoint: RetryConfig,
}

impl ProvisioningRetryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.credentials.validate("retry.credentials")?;
        self.endpoint.validate("retry.endpoint")
    }
}

impl Default for ProvisioningRetryConfig {
    fn default() -> Self {
        Self {
            credentials: RetryConfig::fixed(CREDENTIALS_MAX_ATTEMPTS, PROVISIONING_RETRY_DELAY_MS),
            endpoint: RetryConfig::fixed(ENDPOINT_MAX_ATTEMPTS, PROVISIONING_RETRY_DELAY_MS),
        }
    }
}
