//! Operator entry point.
//!
//! Wires the ambient pieces together: tracing, metrics, the probe/metrics
//! HTTP server, the Kubernetes client, the Nimbus REST client, one
//! reconciliation engine per kind, and the kind registry that runs them.

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info};

use nimbus_cloud_operator::controller::KindRegistry;
use nimbus_cloud_operator::engine::ReconciliationEngine;
use nimbus_cloud_operator::kinds::{DatabaseAdapter, DatabaseApi, StreamAdapter, StreamApi};
use nimbus_cloud_operator::remote::RestClient;
use nimbus_cloud_operator::secrets::K8sCredentialStore;
use nimbus_cloud_operator::server::{start_server, ServerState};
use nimbus_cloud_operator::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_cloud_operator=info".into()),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build = env!("BUILD_DATETIME"),
        "Starting Nimbus Cloud Operator"
    );

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    });

    let server_state_clone = server_state.clone();
    let server_port = std::env::var("METRICS_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or(8080);

    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let endpoint = std::env::var("NIMBUS_ENDPOINT")
        .context("NIMBUS_ENDPOINT environment variable is required")?;
    let rest = RestClient::new(endpoint).context("Failed to build Nimbus REST client")?;

    let credentials = Arc::new(K8sCredentialStore::new(client.clone()));

    let mut registry = KindRegistry::new();
    registry.register(
        client.clone(),
        ReconciliationEngine::new(
            DatabaseAdapter,
            DatabaseApi::new(rest.clone()),
            credentials.clone(),
        ),
    )?;
    registry.register(
        client.clone(),
        ReconciliationEngine::new(
            StreamAdapter,
            StreamApi::new(rest),
            credentials,
        ),
    )?;

    server_state
        .is_ready
        .store(true, std::sync::atomic::Ordering::Relaxed);

    registry.run_all().await;

    info!("Operator stopped");

    Ok(())
}
