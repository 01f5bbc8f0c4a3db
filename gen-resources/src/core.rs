use std::sync::Arc;

use config::shared::GenerateOptions;
use generator::cluster::{ClusterGenerator, Generator};
use generator::installer::HelmInstaller;
use generator::k8s::http::HttpK8sClient;
use generator::registry::SecretClusterRegistry;
use tracing::info;

/// Builds a [`ClusterGenerator`] talking to the cluster of the ambient kubeconfig.
async fn build_generator(options: &GenerateOptions) -> anyhow::Result<ClusterGenerator> {
    let k8s_client = Arc::new(HttpK8sClient::new().await?);
    let registry = SecretClusterRegistry::new(k8s_client.clone(), options.namespace.clone());

    Ok(ClusterGenerator::new(
        k8s_client,
        Arc::new(HelmInstaller::default()),
        Arc::new(registry),
    ))
}

pub async fn generate_clusters(options: GenerateOptions) -> anyhow::Result<()> {
    info!("starting cluster generation");
    log_options(&options);

    let generator = build_generator(&options).await?;
    let summary = generator.generate(&options).await?;

    info!(%summary, "cluster generation completed");
    Ok(())
}

pub async fn clean_clusters(options: GenerateOptions) -> anyhow::Result<()> {
    info!(namespace = options.namespace, "starting cleanup of generated clusters");

    let generator = build_generator(&options).await?;
    generator.clean(&options).await?;

    info!("cleanup of generated clusters completed");
    Ok(())
}

fn log_options(options: &GenerateOptions) {
    let clusters = &options.clusters;
    info!(
        namespace = options.namespace,
        samples = clusters.samples,
        concurrency = clusters.concurrency,
        namespace_prefix = clusters.namespace_prefix,
        cluster_name_prefix = clusters.cluster_name_prefix,
        destination_namespace = clusters.destination_namespace,
        values_file_path = clusters.values_file_path,
        strict = clusters.strict,
        "generate options"
    );

    let retry = &options.retry;
    info!(
        credentials_max_attempts = retry.credentials.max_attempts,
        credentials_delay_ms = retry.credentials.initial_delay_ms,
        endpoint_max_attempts = retry.endpoint.max_attempts,
        endpoint_delay_ms = retry.endpoint.initial_delay_ms,
        "retry options"
    );
}
