//! Reconciliation logic for CAPI cluster import.
//!
//! Each reconcile recomputes the import state from live objects:
//! - control plane not ready: wait
//! - Rancher cluster being deleted: mark the CAPI cluster as imported
//! - Rancher cluster missing: create it if the cluster opts into auto-import
//! - Rancher cluster present: wait for its management name, then apply the
//!   agent registration manifest to the workload cluster until the agent
//!   reports itself deployed
//!
//! Nothing is carried over between reconciles. Any change made to the CAPI
//! cluster is written back with a single optimistic-concurrency merge patch.

pub mod import;
pub mod patch;

use crate::client::{ManagementClient, ObjectKey, RancherClient, RemoteClientFactory};
use crate::error::ControllerError;
use kube_runtime::controller::Action;
use manifest_client::ManifestFetcher;
use std::time::Duration;
use tracing::{debug, info};

/// What the work queue should do with a key after a reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Done until the next watch event.
    Never,
    /// Reconcile again right away.
    Immediately,
    /// Reconcile again after a delay.
    After(Duration),
}

impl Requeue {
    pub fn into_action(self) -> Action {
        match self {
            Requeue::Never => Action::await_change(),
            Requeue::Immediately => Action::requeue(Duration::ZERO),
            Requeue::After(delay) => Action::requeue(delay),
        }
    }
}

/// Reconciles CAPI clusters into Rancher.
pub struct Reconciler {
    pub(crate) management: Box<dyn ManagementClient>,
    pub(crate) rancher: Box<dyn RancherClient>,
    pub(crate) remote_clients: Box<dyn RemoteClientFactory>,
    pub(crate) manifests: Box<dyn ManifestFetcher>,
    pub(crate) requeue_after: Duration,
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(
        management: Box<dyn ManagementClient>,
        rancher: Box<dyn RancherClient>,
        remote_clients: Box<dyn RemoteClientFactory>,
        manifests: Box<dyn ManifestFetcher>,
        requeue_after: Duration,
    ) -> Self {
        Self {
            management,
            rancher,
            remote_clients,
            manifests,
            requeue_after,
        }
    }

    pub fn management(&self) -> &dyn ManagementClient {
        self.management.as_ref()
    }

    pub fn requeue_after(&self) -> Duration {
        self.requeue_after
    }

    /// Reconciles the CAPI cluster identified by `key`.
    ///
    /// Errors from the import flow and from patching the CAPI cluster are
    /// reported together.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Requeue, ControllerError> {
        info!("Reconciling CAPI cluster {}", key);

        let Some(original) = self.management.get_capi_cluster(key).await? else {
            info!("CAPI cluster {} not found", key);
            return Ok(Requeue::Immediately);
        };

        if !original.is_control_plane_ready() {
            info!("Cluster {} control plane is not ready, requeue", key);
            return Ok(Requeue::After(self.requeue_after));
        }

        let mut cluster = original.clone();
        let mut errors = Vec::new();

        let requeue = match self.reconcile_cluster(&mut cluster).await {
            Ok(requeue) => requeue,
            Err(e) => {
                errors.push(e);
                Requeue::Never
            }
        };

        match patch::cluster_patch(&original, &cluster) {
            Ok(Some(diff)) => {
                debug!("Patching CAPI cluster {}: {}", key, diff);
                if let Err(e) = self.management.patch_capi_cluster(key, &diff).await {
                    errors.push(e.into());
                }
            }
            Ok(None) => {}
            Err(e) => errors.push(e.into()),
        }

        match ControllerError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(requeue),
        }
    }
}
