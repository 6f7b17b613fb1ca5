//! Filters deciding which CAPI clusters are reconciled.
//!
//! A cluster is admitted when all of the following hold:
//! - it carries the configured watch-filter label value (if one is set)
//! - it has not been annotated as imported
//! - its control plane is ready
//! - it or its namespace has a truthy auto-import label

use crate::client::ManagementClient;
use crate::config::parse_bool;
use crate::error::ControllerError;
use crds::CapiCluster;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Label enabling automatic import, on a cluster or its namespace.
pub const IMPORT_LABEL: &str = "cluster-api.cattle.io/rancher-auto-import";

/// Label marking Rancher clusters created by this controller.
pub const OWNED_LABEL: &str = "cluster-api.cattle.io/owned";

/// Annotation set on CAPI clusters once their Rancher cluster is removed.
pub const IMPORTED_ANNOTATION: &str = "imported";

/// Label scoping a controller instance to a subset of clusters.
pub const WATCH_FILTER_LABEL: &str = "cluster.x-k8s.io/watch-filter";

/// Reads the auto-import label.
///
/// Returns whether the label is present and whether its value is truthy.
/// Unparseable values count as false.
pub fn should_import(labels: &BTreeMap<String, String>) -> (bool, bool) {
    match labels.get(IMPORT_LABEL) {
        Some(value) => (true, parse_bool(value).unwrap_or(false)),
        None => (false, false),
    }
}

/// True when the cluster or its namespace opts into auto-import.
pub async fn should_auto_import(
    cluster: &CapiCluster,
    management: &dyn ManagementClient,
) -> Result<bool, ControllerError> {
    if should_import(cluster.labels()).1 {
        return Ok(true);
    }

    let Some(namespace) = cluster.namespace() else {
        return Ok(false);
    };

    Ok(management
        .get_namespace(&namespace)
        .await?
        .is_some_and(|ns| should_import(ns.labels()).1))
}

/// Predicates applied to every CAPI cluster before reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ClusterPredicates {
    watch_filter_value: Option<String>,
}

impl ClusterPredicates {
    pub fn new(watch_filter_value: Option<String>) -> Self {
        Self { watch_filter_value }
    }

    pub fn has_watch_filter_label(&self, cluster: &CapiCluster) -> bool {
        match &self.watch_filter_value {
            Some(value) => cluster.labels().get(WATCH_FILTER_LABEL) == Some(value),
            None => true,
        }
    }

    pub fn without_imported_annotation(&self, cluster: &CapiCluster) -> bool {
        !cluster.annotations().contains_key(IMPORTED_ANNOTATION)
    }

    pub fn has_ready_control_plane(&self, cluster: &CapiCluster) -> bool {
        cluster.is_control_plane_ready()
    }

    /// Evaluates all predicates in order, stopping at the first rejection.
    pub async fn admits(
        &self,
        cluster: &CapiCluster,
        management: &dyn ManagementClient,
    ) -> Result<bool, ControllerError> {
        let name = cluster.name_any();

        if !self.has_watch_filter_label(cluster) {
            debug!("Cluster {} does not match the watch filter, skipping", name);
            return Ok(false);
        }
        if !self.without_imported_annotation(cluster) {
            debug!("Cluster {} is already imported, skipping", name);
            return Ok(false);
        }
        if !self.has_ready_control_plane(cluster) {
            debug!("Cluster {} control plane is not ready, skipping", name);
            return Ok(false);
        }
        if !should_auto_import(cluster, management).await? {
            debug!("Cluster {} is not labelled for auto-import, skipping", name);
            return Ok(false);
        }

        Ok(true)
    }
}
