#![cfg(feature = "test-utils")]

use std::sync::Arc;

use generator::cluster::{ClusterGenerator, Generator};
use generator::error::ErrorKind;
use generator::reaper::Reaper;
use generator::registry::{GENERATED_BY_LABEL_SELECTOR, SecretClusterRegistry};
use generator::test_utils::installer::MockInstaller;
use generator::test_utils::k8s::MockK8sClient;
use generator::test_utils::registry::MemoryRegistry;
use telemetry::init_test_tracing;

use crate::support::{CONTROL_NAMESPACE, Harness, generate_options};

mod support;

fn k8s_client_with_namespaces() -> MockK8sClient {
    MockK8sClient::new().with_namespaces(["vcluster-ab12", "other-ns", "vcluster-x"])
}

#[tokio::test]
async fn clean_deletes_only_generated_namespaces() {
    init_test_tracing();
    let harness = Harness::with(
        k8s_client_with_namespaces(),
        MockInstaller::new(),
        MemoryRegistry::new(),
    );

    harness
        .generator()
        .clean(&generate_options(0, 1))
        .await
        .unwrap();

    assert_eq!(
        harness.k8s_client.deleted_namespaces(),
        vec!["vcluster-ab12".to_string(), "vcluster-x".to_string()]
    );
    assert_eq!(
        harness.k8s_client.secret_deletions(),
        vec![(
            CONTROL_NAMESPACE.to_string(),
            GENERATED_BY_LABEL_SELECTOR.to_string()
        )]
    );
}

#[tokio::test]
async fn namespace_deletion_failure_does_not_stop_the_sweep() {
    init_test_tracing();
    let k8s_client = Arc::new(k8s_client_with_namespaces());
    k8s_client.fail_namespace_deletion("vcluster-ab12");

    let report = Reaper::new(k8s_client.clone())
        .clean(CONTROL_NAMESPACE)
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["vcluster-x".to_string()]);
    assert_eq!(report.failed, vec!["vcluster-ab12".to_string()]);
    assert_eq!(
        k8s_client.namespace_deletion_attempts(),
        vec!["vcluster-ab12".to_string(), "vcluster-x".to_string()]
    );
    assert_eq!(k8s_client.secret_deletions().len(), 1);
}

#[tokio::test]
async fn secret_deletion_error_is_returned() {
    init_test_tracing();
    let k8s_client = Arc::new(k8s_client_with_namespaces());
    k8s_client.fail_secret_deletion();

    let err = Reaper::new(k8s_client.clone())
        .clean(CONTROL_NAMESPACE)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeleteFailed);
    // Namespaces are swept before the secrets.
    assert_eq!(k8s_client.deleted_namespaces().len(), 2);
}

#[tokio::test]
async fn listing_failure_still_deletes_secrets() {
    init_test_tracing();
    let k8s_client = Arc::new(k8s_client_with_namespaces());
    k8s_client.fail_namespace_listing();

    let report = Reaper::new(k8s_client.clone())
        .clean(CONTROL_NAMESPACE)
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert!(k8s_client.namespace_deletion_attempts().is_empty());
    assert_eq!(k8s_client.secret_deletions().len(), 1);
}

#[tokio::test]
async fn clean_is_idempotent() {
    init_test_tracing();
    let k8s_client = Arc::new(k8s_client_with_namespaces());
    let reaper = Reaper::new(k8s_client.clone());

    let first = reaper.clean(CONTROL_NAMESPACE).await.unwrap();
    let second = reaper.clean(CONTROL_NAMESPACE).await.unwrap();

    assert_eq!(first.deleted.len(), 2);
    assert!(second.deleted.is_empty());
    assert!(second.failed.is_empty());
    assert_eq!(k8s_client.secret_deletions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn registered_clusters_are_selected_by_cleanup() {
    init_test_tracing();
    let k8s_client = Arc::new(MockK8sClient::new());
    let registry = SecretClusterRegistry::new(k8s_client.clone(), CONTROL_NAMESPACE);
    let generator = ClusterGenerator::new(
        k8s_client.clone(),
        Arc::new(MockInstaller::new()),
        Arc::new(registry),
    );

    let summary = generator.generate(&generate_options(3, 2)).await.unwrap();
    generator.clean(&generate_options(3, 2)).await.unwrap();

    assert_eq!(summary.succeeded, 3);
    let secrets = k8s_client.created_secrets();
    assert_eq!(secrets.len(), 3);

    let (key, value) = GENERATED_BY_LABEL_SELECTOR.split_once('=').unwrap();
    for secret in &secrets {
        assert_eq!(secret.metadata.namespace.as_deref(), Some(CONTROL_NAMESPACE));
        let labels = secret.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get(key).map(String::as_str), Some(value));
    }
    assert_eq!(
        k8s_client.secret_deletions(),
        vec![(
            CONTROL_NAMESPACE.to_string(),
            GENERATED_BY_LABEL_SELECTOR.to_string()
        )]
    );
}
