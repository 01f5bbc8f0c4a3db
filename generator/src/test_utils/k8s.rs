use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;

use crate::k8s::{ExecOutput, K8sClient, K8sError};
use crate::test_utils::access_config::AccessConfigBuilder;
use crate::test_utils::gauge::ConcurrencyGauge;

/// A command run through [`K8sClient::exec_in_pod`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub namespace: String,
    pub pod_name: String,
    pub container: String,
    pub command: Vec<String>,
}

#[derive(Debug)]
struct MockState {
    namespaces: Vec<String>,
    access_config: String,
    exec_failures_left: usize,
    pod_ip: Option<String>,
    pod_ip_failures_left: usize,
    failing_namespace_deletions: HashSet<String>,
    fail_namespace_listing: bool,
    fail_secret_creation: bool,
    fail_secret_deletion: bool,

    exec_calls: Vec<ExecCall>,
    pod_ip_calls: usize,
    namespace_deletion_attempts: Vec<String>,
    deleted_namespaces: Vec<String>,
    created_secrets: Vec<Secret>,
    secret_deletions: Vec<(String, String)>,
}

/// Scriptable in-memory [`K8sClient`].
///
/// By default every pod answers with a valid access config and the IP `10.0.0.1`.
#[derive(Debug)]
pub struct MockK8sClient {
    state: Mutex<MockState>,
    exec_delay: Duration,
    exec_gauge: ConcurrencyGauge,
}

impl MockK8sClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                namespaces: vec![],
                access_config: AccessConfigBuilder::new().build(),
                exec_failures_left: 0,
                pod_ip: Some("10.0.0.1".to_string()),
                pod_ip_failures_left: 0,
                failing_namespace_deletions: HashSet::new(),
                fail_namespace_listing: false,
                fail_secret_creation: false,
                fail_secret_deletion: false,
                exec_calls: vec![],
                pod_ip_calls: 0,
                namespace_deletion_attempts: vec![],
                deleted_namespaces: vec![],
                created_secrets: vec![],
                secret_deletions: vec![],
            }),
            exec_delay: Duration::ZERO,
            exec_gauge: ConcurrencyGauge::default(),
        }
    }

    /// Makes every exec take `delay`, so that concurrent execs overlap.
    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = delay;
        self
    }

    pub fn with_namespaces<I, S>(self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Output of every access config read.
    pub fn set_access_config(&self, document: impl Into<String>) {
        self.state().access_config = document.into();
    }

    /// Fails the next `times` execs. Use [`usize::MAX`] to fail them all.
    pub fn fail_exec(&self, times: usize) {
        self.state().exec_failures_left = times;
    }

    /// IP reported for every pod, [`None`] meaning not assigned yet.
    pub fn set_pod_ip(&self, pod_ip: Option<&str>) {
        self.state().pod_ip = pod_ip.map(str::to_string);
    }

    /// Fails the next `times` pod lookups. Use [`usize::MAX`] to fail them all.
    pub fn fail_pod_lookup(&self, times: usize) {
        self.state().pod_ip_failures_left = times;
    }

    pub fn fail_namespace_deletion(&self, namespace: &str) {
        self.state()
            .failing_namespace_deletions
            .insert(namespace.to_string());
    }

    pub fn fail_namespace_listing(&self) {
        self.state().fail_namespace_listing = true;
    }

    pub fn fail_secret_creation(&self) {
        self.state().fail_secret_creation = true;
    }

    pub fn fail_secret_deletion(&self) {
        self.state().fail_secret_deletion = true;
    }

    pub fn exec_calls(&self) -> Vec<ExecCall> {
        self.state().exec_calls.clone()
    }

    pub fn pod_ip_calls(&self) -> usize {
        self.state().pod_ip_calls
    }

    pub fn namespace_deletion_attempts(&self) -> Vec<String> {
        self.state().namespace_deletion_attempts.clone()
    }

    pub fn deleted_namespaces(&self) -> Vec<String> {
        self.state().deleted_namespaces.clone()
    }

    pub fn created_secrets(&self) -> Vec<Secret> {
        self.state().created_secrets.clone()
    }

    /// `(namespace, label selector)` of every secret collection deletion.
    pub fn secret_deletions(&self) -> Vec<(String, String)> {
        self.state().secret_deletions.clone()
    }

    /// Highest number of execs that were in flight at the same time.
    pub fn max_concurrent_execs(&self) -> usize {
        self.exec_gauge.high_water_mark()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Default for MockK8sClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes one scripted failure, returning whether the call must fail.
fn take_failure(failures_left: &mut usize) -> bool {
    match *failures_left {
        0 => false,
        usize::MAX => true,
        _ => {
            *failures_left -= 1;
            true
        }
    }
}

#[async_trait]
impl K8sClient for MockK8sClient {
    async fn exec_in_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        command: &[&str],
    ) -> Result<ExecOutput, K8sError> {
        let _guard = self.exec_gauge.enter();
        if !self.exec_delay.is_zero() {
            tokio::time::sleep(self.exec_delay).await;
        }

        let mut state = self.state();
        state.exec_calls.push(ExecCall {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
            container: container.to_string(),
            command: command.iter().map(|part| part.to_string()).collect(),
        });

        if take_failure(&mut state.exec_failures_left) {
            return Err(K8sError::Exec(format!(
                "container {container} not found in pod {pod_name}"
            )));
        }

        Ok(ExecOutput {
            stdout: state.access_config.clone().into_bytes(),
            stderr: vec![],
        })
    }

    async fn get_pod_ip(
        &self,
        _namespace: &str,
        pod_name: &str,
    ) -> Result<Option<String>, K8sError> {
        let mut state = self.state();
        state.pod_ip_calls += 1;

        if take_failure(&mut state.pod_ip_failures_left) {
            return Err(K8sError::Exec(format!("pod {pod_name} not found")));
        }

        Ok(state.pod_ip.clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, K8sError> {
        let state = self.state();
        if state.fail_namespace_listing {
            return Err(K8sError::Exec("namespaces are forbidden".to_string()));
        }

        Ok(state.namespaces.clone())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), K8sError> {
        let mut state = self.state();
        state.namespace_deletion_attempts.push(name.to_string());

        if state.failing_namespace_deletions.contains(name) {
            return Err(K8sError::Exec(format!("namespace {name} is terminating")));
        }

        state.namespaces.retain(|namespace| namespace != name);
        state.deleted_namespaces.push(name.to_string());

        Ok(())
    }

    async fn create_secret(&self, _namespace: &str, secret: &Secret) -> Result<(), K8sError> {
        let mut state = self.state();
        if state.fail_secret_creation {
            return Err(K8sError::Exec("secret already exists".to_string()));
        }

        state.created_secrets.push(secret.clone());

        Ok(())
    }

    async fn delete_secrets_by_label(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<(), K8sError> {
        let mut state = self.state();
        state
            .secret_deletions
            .push((namespace.to_string(), label_selector.to_string()));

        if state.fail_secret_deletion {
            return Err(K8sError::Exec("secrets are forbidden".to_string()));
        }

        Ok(())
    }
}
