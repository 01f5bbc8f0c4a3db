//! Retrieval of the client credentials of a freshly installed cluster.
//!
//! The control pod of every release writes an access config (kubeconfig-shaped YAML document) to
//! a well-known path. The extractor reads it through a remote exec and decodes the embedded
//! certificate material.

use std::sync::Arc;

use base64::{Engine, prelude::BASE64_STANDARD};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ErrorKind, GenError, GenResult};
use crate::gen_error;
use crate::k8s::K8sClient;
use crate::unit::control_pod_name;

/// Container of the control pod holding the generated access config.
const SYNCER_CONTAINER: &str = "syncer";

/// Command printing the generated access config.
const READ_ACCESS_CONFIG_COMMAND: [&str; 3] = ["sh", "-c", "cat /root/.kube/config"];

/// Client credentials of a provisioned cluster, decoded to raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCredentials {
    pub ca_data: Vec<u8>,
    pub cert_data: Vec<u8>,
    pub key_data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct AccessConfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default, rename = "users")]
    auth_infos: Vec<NamedAuthInfo>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    #[serde(rename = "certificate-authority-data", default)]
    certificate_authority_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedAuthInfo {
    #[serde(rename = "user")]
    auth_info: AuthInfoEntry,
}

#[derive(Debug, Deserialize)]
struct AuthInfoEntry {
    #[serde(rename = "client-certificate-data", default)]
    client_certificate_data: Option<String>,
    #[serde(rename = "client-key-data", default)]
    client_key_data: Option<String>,
}

/// Decodes one base64 field of the access config, rejecting absent or empty values.
fn decode_field(value: Option<&str>, field: &'static str) -> GenResult<Vec<u8>> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Err(gen_error!(
            ErrorKind::ExtractionFailed,
            "Access config is missing credential data",
            field
        ));
    };

    let decoded = BASE64_STANDARD
        .decode(value.trim())
        .map_err(|err| GenError::from(err).with_kind(ErrorKind::ExtractionFailed))?;

    if decoded.is_empty() {
        return Err(gen_error!(
            ErrorKind::ExtractionFailed,
            "Access config contains empty credential data",
            field
        ));
    }

    Ok(decoded)
}

/// Parses an access config document and decodes the credentials of its first cluster and user.
///
/// Documents listing several clusters or users are not disambiguated: the first entry of each
/// list is used. Any missing list, field or decoding failure is an [`ErrorKind::ExtractionFailed`]
/// error; partial credentials are never returned.
pub fn parse_access_config(document: &[u8]) -> GenResult<ExtractedCredentials> {
    let config: AccessConfig = serde_yaml::from_slice(document)
        .map_err(|err| GenError::from(err).with_kind(ErrorKind::ExtractionFailed))?;

    let Some(cluster) = config.clusters.first() else {
        return Err(gen_error!(
            ErrorKind::ExtractionFailed,
            "Access config contains no clusters"
        ));
    };
    let Some(auth_info) = config.auth_infos.first() else {
        return Err(gen_error!(
            ErrorKind::ExtractionFailed,
            "Access config contains no users"
        ));
    };

    let ca_data = decode_field(
        cluster.cluster.certificate_authority_data.as_deref(),
        "certificate-authority-data",
    )?;
    let cert_data = decode_field(
        auth_info.auth_info.client_certificate_data.as_deref(),
        "client-certificate-data",
    )?;
    let key_data = decode_field(
        auth_info.auth_info.client_key_data.as_deref(),
        "client-key-data",
    )?;

    Ok(ExtractedCredentials {
        ca_data,
        cert_data,
        key_data,
    })
}

/// Reads the access config out of a control pod and decodes its credentials.
///
/// A single call makes a single attempt; retrying is up to the caller.
#[derive(Clone)]
pub struct CredentialExtractor {
    k8s_client: Arc<dyn K8sClient>,
}

impl CredentialExtractor {
    pub fn new(k8s_client: Arc<dyn K8sClient>) -> CredentialExtractor {
        CredentialExtractor { k8s_client }
    }

    pub async fn extract(
        &self,
        namespace: &str,
        release_suffix: &str,
    ) -> GenResult<ExtractedCredentials> {
        let pod_name = control_pod_name(release_suffix);
        debug!(namespace, pod_name, "reading access config from control pod");

        let output = self
            .k8s_client
            .exec_in_pod(
                namespace,
                &pod_name,
                SYNCER_CONTAINER,
                &READ_ACCESS_CONFIG_COMMAND,
            )
            .await
            .map_err(|err| GenError::from(err).with_kind(ErrorKind::ExtractionFailed))?;

        parse_access_config(&output.stdout)
    }
}
