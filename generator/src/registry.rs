//! Registration of provisioned clusters.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, prelude::BASE64_STANDARD};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use tracing::info;

use crate::credentials::ExtractedCredentials;
use crate::error::{ErrorKind, GenError, GenResult};
use crate::k8s::K8sClient;

/// Label marking every resource created by the generator.
pub const GENERATED_BY_LABEL_KEY: &str = "app.kubernetes.io/generated-by";

pub const GENERATED_BY_LABEL_VALUE: &str = "argocd-generator";

/// Selector matching every secret created by the generator.
pub const GENERATED_BY_LABEL_SELECTOR: &str = "app.kubernetes.io/generated-by=argocd-generator";

/// Label through which Argo CD discovers cluster secrets.
const SECRET_TYPE_LABEL_KEY: &str = "argocd.argoproj.io/secret-type";

const SECRET_TYPE_CLUSTER: &str = "cluster";

/// Identity the API server certificate of a provisioned cluster is issued for.
pub const CLUSTER_SERVER_NAME: &str = "kubernetes.default.svc";

/// Kubernetes version reported for provisioned clusters.
pub const CLUSTER_SERVER_VERSION: &str = "1.18";

/// Labels attached to every generated cluster record.
pub fn generated_by_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(
        GENERATED_BY_LABEL_KEY.to_string(),
        GENERATED_BY_LABEL_VALUE.to_string(),
    )])
}

/// TLS settings used to reach a registered cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsClientConfig {
    pub insecure: bool,
    pub server_name: String,
    pub ca_data: Vec<u8>,
    pub cert_data: Vec<u8>,
    pub key_data: Vec<u8>,
}

/// A provisioned cluster as handed to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRecord {
    /// API server URI, empty when the endpoint could not be resolved.
    pub server: String,
    pub name: String,
    pub tls_client_config: TlsClientConfig,
    pub server_version: String,
    pub namespaces: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl ClusterRecord {
    /// Builds the record of a generated cluster from its credentials.
    pub fn generated(
        server: String,
        name: String,
        credentials: ExtractedCredentials,
        destination_namespace: &str,
    ) -> ClusterRecord {
        ClusterRecord {
            server,
            name,
            tls_client_config: TlsClientConfig {
                insecure: false,
                server_name: CLUSTER_SERVER_NAME.to_string(),
                ca_data: credentials.ca_data,
                cert_data: credentials.cert_data,
                key_data: credentials.key_data,
            },
            server_version: CLUSTER_SERVER_VERSION.to_string(),
            namespaces: vec![destination_namespace.to_string()],
            labels: generated_by_labels(),
        }
    }
}

/// Persistent store of provisioned clusters.
///
/// Records are only ever created; the generator never updates them.
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    async fn create_cluster(&self, record: &ClusterRecord) -> GenResult<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecretClusterConfig<'a> {
    tls_client_config: SecretTlsClientConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecretTlsClientConfig<'a> {
    insecure: bool,
    server_name: &'a str,
    ca_data: String,
    cert_data: String,
    key_data: String,
}

/// [`ClusterRegistry`] storing each record as an Argo CD cluster secret.
///
/// Secrets carry the generated-by label of the record, which is what the reaper selects on.
#[derive(Clone)]
pub struct SecretClusterRegistry {
    k8s_client: Arc<dyn K8sClient>,
    namespace: String,
}

impl SecretClusterRegistry {
    pub fn new(k8s_client: Arc<dyn K8sClient>, namespace: impl Into<String>) -> Self {
        SecretClusterRegistry {
            k8s_client,
            namespace: namespace.into(),
        }
    }

    /// Encodes a record as a cluster secret of the registry namespace.
    pub fn cluster_secret(&self, record: &ClusterRecord) -> GenResult<Secret> {
        let tls = &record.tls_client_config;
        let config = serde_json::to_string(&SecretClusterConfig {
            tls_client_config: SecretTlsClientConfig {
                insecure: tls.insecure,
                server_name: &tls.server_name,
                ca_data: BASE64_STANDARD.encode(&tls.ca_data),
                cert_data: BASE64_STANDARD.encode(&tls.cert_data),
                key_data: BASE64_STANDARD.encode(&tls.key_data),
            },
        })?;

        let mut labels = record.labels.clone();
        labels.insert(
            SECRET_TYPE_LABEL_KEY.to_string(),
            SECRET_TYPE_CLUSTER.to_string(),
        );

        let string_data = BTreeMap::from([
            ("name".to_string(), record.name.clone()),
            ("server".to_string(), record.server.clone()),
            ("namespaces".to_string(), record.namespaces.join(",")),
            ("config".to_string(), config),
        ]);

        Ok(Secret {
            metadata: ObjectMeta {
                name: Some(format!("cluster-{}", record.name)),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                ..ObjectMeta::default()
            },
            string_data: Some(string_data),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        })
    }
}

#[async_trait]
impl ClusterRegistry for SecretClusterRegistry {
    async fn create_cluster(&self, record: &ClusterRecord) -> GenResult<()> {
        let secret = self
            .cluster_secret(record)
            .map_err(|err| err.with_kind(ErrorKind::RegistrationFailed))?;

        self.k8s_client
            .create_secret(&self.namespace, &secret)
            .await
            .map_err(|err| GenError::from(err).with_kind(ErrorKind::RegistrationFailed))?;

        info!(
            cluster = record.name,
            server = record.server,
            namespace = self.namespace,
            "registered cluster"
        );

        Ok(())
    }
}
