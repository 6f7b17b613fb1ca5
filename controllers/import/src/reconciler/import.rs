//! Import state machine for a single CAPI cluster.

use super::{Reconciler, Requeue};
use crate::client::ObjectKey;
use crate::error::ControllerError;
use crate::manifest::apply_manifest;
use crate::metrics;
use crate::naming::to_rancher_name;
use crate::predicates::{should_auto_import, IMPORTED_ANNOTATION, OWNED_LABEL};
use crds::{
    CapiCluster, ClusterRegistrationToken, ClusterRegistrationTokenSpec, RancherCluster,
    RancherClusterSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{info, warn};

impl Reconciler {
    /// Runs one transition of the import flow. Changes to the CAPI cluster
    /// are made in place and persisted by the caller.
    pub(crate) async fn reconcile_cluster(
        &self,
        cluster: &mut CapiCluster,
    ) -> Result<Requeue, ControllerError> {
        let key = rancher_cluster_key(cluster)?;

        let rancher_cluster = self.rancher.get_rancher_cluster(&key).await.map_err(|e| {
            warn!("Unable to fetch Rancher cluster {}: {}", key, e);
            e
        })?;

        match rancher_cluster {
            Some(rc) if rc.is_deleting() => Ok(self.reconcile_delete(cluster)),
            Some(rc) => self.reconcile_normal(cluster, &rc).await,
            None => self.create_rancher_cluster(cluster, &key).await,
        }
    }

    async fn create_rancher_cluster(
        &self,
        cluster: &CapiCluster,
        key: &ObjectKey,
    ) -> Result<Requeue, ControllerError> {
        if !should_auto_import(cluster, self.management.as_ref()).await? {
            info!(
                "Not auto importing cluster {} as namespace or cluster isn't marked auto import",
                cluster.name_any()
            );
            return Ok(Requeue::Never);
        }

        let rancher_cluster = build_rancher_cluster(cluster, key)?;
        self.rancher.create_rancher_cluster(&rancher_cluster).await?;
        metrics::record_rancher_cluster_created();
        info!("Created Rancher cluster {}", key);

        Ok(Requeue::Immediately)
    }

    async fn reconcile_normal(
        &self,
        cluster: &CapiCluster,
        rancher_cluster: &RancherCluster,
    ) -> Result<Requeue, ControllerError> {
        let Some(cluster_name) = rancher_cluster.management_cluster_name() else {
            info!("Cluster name not set yet for {}, requeue", rancher_cluster.name_any());
            return Ok(Requeue::After(self.requeue_after));
        };
        info!("Found cluster name {}", cluster_name);

        if rancher_cluster.agent_deployed() {
            info!("Agent already deployed for {}, no action needed", cluster_name);
            return Ok(Requeue::Never);
        }

        let namespace = cluster.namespace().unwrap_or_default();
        let Some(manifest) = self.registration_manifest(cluster_name, &namespace).await? else {
            info!("Import manifest URL not set yet for {}, requeue", cluster_name);
            return Ok(Requeue::After(self.requeue_after));
        };

        info!("Creating import manifest for {}", cluster.name_any());
        let remote = self.remote_clients.client_for(cluster).await?;
        let outcome = apply_manifest(remote.as_ref(), Cursor::new(manifest)).await?;
        metrics::record_manifest_outcome(&outcome);
        info!(
            "Successfully applied import manifest to {} ({} created, {} already present)",
            cluster.name_any(),
            outcome.created,
            outcome.already_existing
        );

        Ok(Requeue::Never)
    }

    fn reconcile_delete(&self, cluster: &mut CapiCluster) -> Requeue {
        info!(
            "Rancher cluster is being removed, annotating CAPI cluster {} with {}",
            cluster.name_any(),
            IMPORTED_ANNOTATION
        );
        cluster
            .annotations_mut()
            .insert(IMPORTED_ANNOTATION.to_string(), "true".to_string());
        Requeue::Never
    }

    /// Gets or creates the registration token and downloads its manifest.
    ///
    /// `Ok(None)` while Rancher has not published the manifest URL yet.
    async fn registration_manifest(
        &self,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<Option<String>, ControllerError> {
        let key = ObjectKey::new(namespace, cluster_name);

        let token = match self.rancher.get_registration_token(&key).await? {
            Some(token) => token,
            None => {
                info!("Creating registration token for cluster {}", cluster_name);
                let token = build_registration_token(cluster_name, namespace);
                self.rancher.create_registration_token(&token).await?
            }
        };

        let Some(url) = token.manifest_url() else {
            return Ok(None);
        };

        let manifest = self.manifests.fetch(url).await.map_err(|e| {
            warn!("Failed downloading import manifest for {}: {}", cluster_name, e);
            e
        })?;
        Ok(Some(manifest))
    }
}

fn rancher_cluster_key(cluster: &CapiCluster) -> Result<ObjectKey, ControllerError> {
    let namespace = cluster.namespace().ok_or_else(|| {
        ControllerError::InvalidResource(format!("cluster {} has no namespace", cluster.name_any()))
    })?;
    Ok(ObjectKey::new(namespace, to_rancher_name(&cluster.name_any())))
}

fn build_rancher_cluster(
    cluster: &CapiCluster,
    key: &ObjectKey,
) -> Result<RancherCluster, ControllerError> {
    let uid = cluster.uid().ok_or_else(|| {
        ControllerError::InvalidResource(format!("cluster {} has no uid", cluster.name_any()))
    })?;

    let mut rancher_cluster = RancherCluster::new(&key.name, RancherClusterSpec::default());
    rancher_cluster.metadata.namespace = Some(key.namespace.clone());
    rancher_cluster.metadata.owner_references = Some(vec![OwnerReference {
        api_version: CapiCluster::api_version(&()).to_string(),
        kind: CapiCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid,
        ..Default::default()
    }]);
    rancher_cluster.metadata.labels = Some(BTreeMap::from([(
        OWNED_LABEL.to_string(),
        String::new(),
    )]));
    Ok(rancher_cluster)
}

fn build_registration_token(cluster_name: &str, namespace: &str) -> ClusterRegistrationToken {
    let mut token = ClusterRegistrationToken::new(
        cluster_name,
        ClusterRegistrationTokenSpec {
            cluster_name: cluster_name.to_string(),
        },
    );
    token.metadata.namespace = Some(namespace.to_string());
    token
}
