#![cfg(feature = "test-utils")]

use std::time::Duration;

use generator::error::ErrorKind;
use generator::provisioner::ProvisionPolicy;
use generator::registry::{CLUSTER_SERVER_NAME, GENERATED_BY_LABEL_KEY};
use generator::test_utils::access_config::{AccessConfigBuilder, CA_BYTES, CERT_BYTES, KEY_BYTES};
use generator::test_utils::installer::MockInstaller;
use generator::test_utils::k8s::MockK8sClient;
use generator::test_utils::registry::MemoryRegistry;
use telemetry::init_test_tracing;
use tokio::time::Instant;

use crate::support::Harness;

mod support;

#[tokio::test(start_paused = true)]
async fn provisioned_unit_is_registered_with_its_credentials() {
    init_test_tracing();
    let harness = Harness::new();

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    let installs = harness.installer.calls();
    assert_eq!(installs.len(), 1);
    let install = &installs[0];
    assert!(install.namespace.starts_with("vcluster-"));
    assert!(install.release_name.starts_with("vcluster-"));
    assert_eq!(install.values_file_path, "/tmp/vcluster-values.yaml");

    let execs = harness.k8s_client.exec_calls();
    assert_eq!(execs.len(), 1);
    assert_eq!(execs[0].namespace, install.namespace);
    assert_eq!(execs[0].pod_name, format!("{}-0", install.release_name));
    assert_eq!(execs[0].container, "syncer");
    assert_eq!(execs[0].command, vec!["sh", "-c", "cat /root/.kube/config"]);

    let records = harness.registry.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.server, "https://10.0.0.1:8443");
    assert!(record.name.starts_with("cluster-"));
    assert_eq!(record.namespaces, vec!["default".to_string()]);
    assert_eq!(record.server_version, "1.18");
    assert!(record.labels.contains_key(GENERATED_BY_LABEL_KEY));
    assert_eq!(record.tls_client_config.server_name, CLUSTER_SERVER_NAME);
    assert_eq!(record.tls_client_config.ca_data, CA_BYTES);
    assert_eq!(record.tls_client_config.cert_data, CERT_BYTES);
    assert_eq!(record.tls_client_config.key_data, KEY_BYTES);
}

#[tokio::test(start_paused = true)]
async fn extraction_failing_on_every_attempt_never_registers() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.fail_exec(usize::MAX);
    let start = Instant::now();

    let err = harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
    // One attempt plus five retries, ten seconds apart.
    assert_eq!(harness.k8s_client.exec_calls().len(), 6);
    assert!(start.elapsed() >= Duration::from_secs(50));
    assert_eq!(harness.k8s_client.pod_ip_calls(), 0);
    assert_eq!(harness.registry.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn extraction_recovers_within_retry_budget() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.fail_exec(5);

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    assert_eq!(harness.k8s_client.exec_calls().len(), 6);
    assert_eq!(harness.registry.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_cluster_list_fails_extraction() {
    init_test_tracing();
    let harness = Harness::new();
    harness
        .k8s_client
        .set_access_config(AccessConfigBuilder::new().without_clusters().build());

    let err = harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
    assert_eq!(harness.registry.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn unresolved_endpoint_still_registers_with_empty_server() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.set_pod_ip(None);

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    assert_eq!(harness.k8s_client.pod_ip_calls(), 10);
    let records = harness.registry.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].server, "");
}

#[tokio::test(start_paused = true)]
async fn missing_control_pod_still_registers_with_empty_server() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.fail_pod_lookup(usize::MAX);

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    assert_eq!(harness.k8s_client.pod_ip_calls(), 10);
    assert_eq!(harness.registry.attempts(), 1);
    assert_eq!(harness.registry.records()[0].server, "");
}

#[tokio::test(start_paused = true)]
async fn endpoint_resolved_after_retries_is_registered() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.fail_pod_lookup(4);

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    assert_eq!(harness.k8s_client.pod_ip_calls(), 5);
    assert_eq!(harness.registry.records()[0].server, "https://10.0.0.1:8443");
}

#[tokio::test(start_paused = true)]
async fn unresolved_endpoint_fails_unit_when_degrading_is_disabled() {
    init_test_tracing();
    let harness = Harness::new();
    harness.k8s_client.set_pod_ip(None);
    let policy = ProvisionPolicy {
        degrade_to_unresolved_on_timeout: false,
        ..ProvisionPolicy::default()
    };

    let err = harness.provisioner(policy).provision(1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResolutionFailed);
    assert_eq!(harness.k8s_client.pod_ip_calls(), 10);
    assert_eq!(harness.registry.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn install_failure_is_tolerated_by_default() {
    init_test_tracing();
    let harness = Harness::with(
        MockK8sClient::new(),
        MockInstaller::failing(),
        MemoryRegistry::new(),
    );

    harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap();

    assert_eq!(harness.installer.calls().len(), 1);
    assert_eq!(harness.registry.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn install_failure_fails_unit_when_not_tolerated() {
    init_test_tracing();
    let harness = Harness::with(
        MockK8sClient::new(),
        MockInstaller::failing(),
        MemoryRegistry::new(),
    );
    let policy = ProvisionPolicy {
        continue_on_install_error: false,
        ..ProvisionPolicy::default()
    };

    let err = harness.provisioner(policy).provision(1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallFailed);
    assert!(harness.k8s_client.exec_calls().is_empty());
    assert_eq!(harness.registry.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn registry_failure_fails_unit() {
    init_test_tracing();
    let harness = Harness::with(
        MockK8sClient::new(),
        MockInstaller::new(),
        MemoryRegistry::failing(),
    );

    let err = harness
        .provisioner(ProvisionPolicy::default())
        .provision(1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RegistrationFailed);
    assert_eq!(harness.registry.attempts(), 1);
}
