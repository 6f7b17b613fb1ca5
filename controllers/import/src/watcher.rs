//! Kubernetes resource watchers.
//!
//! One `kube_runtime::Controller` keyed on CAPI clusters. Two secondary
//! watches feed it:
//! - Rancher clusters map back to the CAPI cluster they were created for
//! - Namespaces with a truthy auto-import label map to every cached CAPI
//!   cluster in them
//!
//! Every key goes through `ClusterPredicates` before it reaches the
//! reconciler.

use crate::client::ObjectKey;
use crate::error::ControllerError;
use crate::metrics;
use crate::naming::to_capi_name;
use crate::predicates::{should_import, ClusterPredicates, IMPORT_LABEL};
use crate::reconciler::{Reconciler, Requeue};
use crate::server::Readiness;
use crds::{CapiCluster, RancherCluster};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{self, Action, Config as ControllerConfig};
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Shared state handed to every reconcile.
pub struct Context {
    pub reconciler: Arc<Reconciler>,
    pub predicates: ClusterPredicates,
}

/// Maps a Rancher cluster event to its CAPI cluster.
pub fn rancher_cluster_to_capi(cluster: &RancherCluster) -> Option<ObjectRef<CapiCluster>> {
    let namespace = cluster.namespace()?;
    let name = cluster.name_any();
    Some(ObjectRef::new(to_capi_name(&name)).within(&namespace))
}

/// Maps a namespace event to the cached CAPI clusters in it.
///
/// Namespaces without a truthy auto-import label map to nothing.
pub fn namespace_to_capi(
    namespace: &Namespace,
    clusters: &[Arc<CapiCluster>],
) -> Vec<ObjectRef<CapiCluster>> {
    if !should_import(namespace.labels()).1 {
        debug!(
            "Namespace {} doesn't have import label with a true value, skipping",
            namespace.name_any()
        );
        return Vec::new();
    }

    let name = namespace.name_any();
    clusters
        .iter()
        .filter(|c| c.namespace().as_deref() == Some(name.as_str()))
        .map(|c| ObjectRef::from_obj(c.as_ref()))
        .collect()
}

async fn reconcile(cluster: Arc<CapiCluster>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let start = Instant::now();
    let key = ObjectKey::new(cluster.namespace().unwrap_or_default(), cluster.name_any());

    if !ctx
        .predicates
        .admits(&cluster, ctx.reconciler.management())
        .await?
    {
        metrics::record_reconcile("skipped", start.elapsed());
        return Ok(Action::await_change());
    }

    let result = ctx.reconciler.reconcile(&key).await;
    match &result {
        Ok(requeue) => {
            debug!("Reconciled CAPI cluster {}: {:?}", key, requeue);
            metrics::record_reconcile("success", start.elapsed());
        }
        Err(e) => {
            error!("Reconciliation failed for CAPI cluster {}: {}", key, e);
            metrics::record_reconcile("error", start.elapsed());
        }
    }
    result.map(Requeue::into_action)
}

/// True for keys mapped from a secondary watch with no CAPI cluster behind
/// them, e.g. Rancher's own `local` cluster.
fn is_unknown_cluster<ReconcileErr, QueueErr>(error: &controller::Error<ReconcileErr, QueueErr>) -> bool
where
    ReconcileErr: std::error::Error + 'static,
    QueueErr: std::error::Error + 'static,
{
    matches!(error, controller::Error::ObjectNotFound(_))
}

fn error_policy(cluster: Arc<CapiCluster>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    error!(
        "Reconciliation error for CAPI cluster {}/{}: {}",
        cluster.namespace().unwrap_or_default(),
        cluster.name_any(),
        error
    );
    Action::requeue(ctx.reconciler.requeue_after())
}

/// Watches CAPI clusters and the resources that feed them.
pub struct Watcher {
    context: Arc<Context>,
    capi_api: Api<CapiCluster>,
    rancher_api: Api<RancherCluster>,
    namespace_api: Api<Namespace>,
    concurrency: u16,
    readiness: Readiness,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context>,
        capi_api: Api<CapiCluster>,
        rancher_api: Api<RancherCluster>,
        namespace_api: Api<Namespace>,
        concurrency: u16,
        readiness: Readiness,
    ) -> Self {
        Self {
            context,
            capi_api,
            rancher_api,
            namespace_api,
            concurrency,
            readiness,
        }
    }

    /// Runs the controller until its streams end.
    pub async fn watch_capi_clusters(&self) -> Result<(), ControllerError> {
        info!("Starting CAPI cluster watcher");

        // Debounce batches bursts of status updates into one reconcile
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(self.concurrency);

        let controller = Controller::new(self.capi_api.clone(), watcher::Config::default())
            .with_config(controller_config);

        let store = controller.store();
        self.spawn_readiness(store.clone());

        controller
            .watches(
                self.rancher_api.clone(),
                watcher::Config::default(),
                |rancher_cluster| rancher_cluster_to_capi(&rancher_cluster),
            )
            .watches(
                self.namespace_api.clone(),
                watcher::Config::default().labels(IMPORT_LABEL),
                move |namespace| namespace_to_capi(&namespace, &store.state()),
            )
            .run(reconcile, error_policy, self.context.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {}", obj),
                    Err(e) if is_unknown_cluster(&e) => debug!("Skipping event: {}", e),
                    Err(e) => error!("Controller error for CAPI clusters: {}", e),
                }
            })
            .await;

        Ok(())
    }

    fn spawn_readiness(&self, store: Store<CapiCluster>) {
        let readiness = self.readiness.clone();
        tokio::spawn(async move {
            if store.wait_until_ready().await.is_ok() {
                info!("CAPI cluster cache synced");
                readiness.set_ready();
            }
        });
    }
}
