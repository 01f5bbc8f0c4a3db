use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ErrorKind, GenError, GenResult};
use crate::gen_error;
use crate::k8s::K8sClient;
use crate::retry::{RetryPolicy, retry_with_policy};
use crate::unit::control_pod_name;

/// Port the control plane of a provisioned cluster listens on.
const API_SERVER_PORT: u16 = 8443;

/// Server URI registered for a cluster whose endpoint could not be resolved.
pub const UNRESOLVED_ENDPOINT: &str = "";

/// Builds the API server URI of a cluster from the IP of its control pod.
pub fn endpoint_uri(pod_ip: &str) -> String {
    if pod_ip.contains(':') {
        format!("https://[{pod_ip}]:{API_SERVER_PORT}")
    } else {
        format!("https://{pod_ip}:{API_SERVER_PORT}")
    }
}

/// Looks up the API server URI of a provisioned cluster.
///
/// The control pod may not have an IP right after the install finished, hence the retrying
/// variants.
#[derive(Clone)]
pub struct EndpointResolver {
    k8s_client: Arc<dyn K8sClient>,
    retry_policy: RetryPolicy,
}

impl EndpointResolver {
    pub fn new(k8s_client: Arc<dyn K8sClient>, retry_policy: RetryPolicy) -> EndpointResolver {
        EndpointResolver {
            k8s_client,
            retry_policy,
        }
    }

    /// Makes a single attempt at resolving the endpoint.
    pub async fn resolve(&self, namespace: &str, release_suffix: &str) -> GenResult<String> {
        let pod_name = control_pod_name(release_suffix);

        let pod_ip = self
            .k8s_client
            .get_pod_ip(namespace, &pod_name)
            .await
            .map_err(|err| GenError::from(err).with_kind(ErrorKind::ResolutionFailed))?;

        let Some(pod_ip) = pod_ip else {
            return Err(gen_error!(
                ErrorKind::ResolutionFailed,
                "Control pod has no IP assigned yet",
                pod_name
            ));
        };

        let uri = endpoint_uri(&pod_ip);
        info!(namespace, pod_name, uri, "resolved cluster endpoint");

        Ok(uri)
    }

    /// Resolves the endpoint, retrying according to the resolver's policy.
    pub async fn resolve_with_retry(
        &self,
        namespace: &str,
        release_suffix: &str,
    ) -> GenResult<String> {
        retry_with_policy(
            &self.retry_policy,
            "resolve_endpoint",
            |_| self.resolve(namespace, release_suffix),
            |_| true,
        )
        .await
    }

    /// Resolves the endpoint, returning [`UNRESOLVED_ENDPOINT`] once every attempt failed.
    ///
    /// The final error is logged and swallowed, so callers must treat an empty URI as a failure
    /// signal of its own.
    pub async fn resolve_or_unresolved(&self, namespace: &str, release_suffix: &str) -> String {
        match self.resolve_with_retry(namespace, release_suffix).await {
            Ok(uri) => uri,
            Err(err) => {
                warn!(
                    namespace,
                    release_suffix,
                    attempts = self.retry_policy.max_attempts(),
                    error = %err,
                    "giving up on resolving cluster endpoint"
                );

                UNRESOLVED_ENDPOINT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_https_uri_on_api_port() {
        assert_eq!(endpoint_uri("10.244.1.7"), "https://10.244.1.7:8443");
    }

    #[test]
    fn brackets_ipv6_addresses() {
        assert_eq!(endpoint_uri("fd00::12"), "https://[fd00::12]:8443");
    }
}
