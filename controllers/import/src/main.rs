//! CAPI Import Controller
//!
//! Imports Cluster API clusters into Rancher:
//! - Creates a Rancher provisioning cluster for every CAPI cluster that opts
//!   into auto-import (label on the cluster or its namespace)
//! - Applies Rancher's agent registration manifest to the workload cluster
//! - Marks CAPI clusters as imported once their Rancher cluster is removed
//!
//! Configuration comes from environment variables, see `config`.

mod client;
mod config;
mod controller;
mod error;
mod manifest;
mod metrics;
mod naming;
mod predicates;
mod reconciler;
mod server;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Both kube and reqwest pull in rustls; pin the process-wide provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting CAPI Import Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Watch filter: {}", config.watch_filter_value.as_deref().unwrap_or("none"));
    info!("  Insecure skip verify: {}", config.insecure_skip_verify);
    info!(
        "  Manifest download timeout: {}",
        config
            .manifest_timeout
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "none".to_string())
    );
    info!("  Requeue after: {}s", config.requeue_after.as_secs());
    info!("  Concurrency: {}", config.concurrency);
    info!("  Probe address: {}", config.probe_addr);

    metrics::init_global_metrics()?;

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
