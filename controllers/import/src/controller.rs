//! Main controller implementation.
//!
//! Builds the clients, wires them into the reconciler and runs the CAPI
//! cluster watcher next to the probe server. Either task exiting stops the
//! controller.

use crate::client::{KubeManagementClient, KubeRancherClient, KubeconfigSecretClientFactory};
use crate::config::Config;
use crate::error::ControllerError;
use crate::predicates::ClusterPredicates;
use crate::reconciler::Reconciler;
use crate::server::{self, Readiness};
use crate::watcher::{Context, Watcher};
use crds::{CapiCluster, RancherCluster};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use manifest_client::{ClientOptions, ManifestClient};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for CAPI cluster import.
pub struct Controller {
    capi_cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing import controller");

        let kube_client = Client::try_default().await?;

        let manifest_client = ManifestClient::new(ClientOptions {
            insecure_skip_verify: config.insecure_skip_verify,
            timeout: config.manifest_timeout,
        })?;

        let (capi_api, rancher_api): (Api<CapiCluster>, Api<RancherCluster>) =
            match config.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
            };
        let namespace_api: Api<Namespace> = Api::all(kube_client.clone());

        let reconciler = Reconciler::new(
            Box::new(KubeManagementClient::new(kube_client.clone())),
            Box::new(KubeRancherClient::new(kube_client.clone())),
            Box::new(KubeconfigSecretClientFactory::new(kube_client.clone())),
            Box::new(manifest_client),
            config.requeue_after,
        );

        let context = Arc::new(Context {
            reconciler: Arc::new(reconciler),
            predicates: ClusterPredicates::new(config.watch_filter_value.clone()),
        });

        let readiness = Readiness::default();
        let watcher = Watcher::new(
            context,
            capi_api,
            rancher_api,
            namespace_api,
            config.concurrency,
            readiness.clone(),
        );

        let capi_cluster_watcher = tokio::spawn(async move { watcher.watch_capi_clusters().await });
        let probe_addr = config.probe_addr;
        let probe_server = tokio::spawn(async move { server::serve(probe_addr, readiness).await });

        Ok(Self {
            capi_cluster_watcher,
            probe_server,
        })
    }

    /// Runs until the watcher or the probe server exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Import controller running");

        tokio::select! {
            result = &mut self.capi_cluster_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("CAPI cluster watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("CAPI cluster watcher error: {}", e)))?;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
