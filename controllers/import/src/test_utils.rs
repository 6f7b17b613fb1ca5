//! Test utilities for unit testing the reconciler
//!
//! Builders for the objects the import flow reads, plus a reconciler wired to
//! in-memory clients.

use crate::client::mock::{
    MockManagementClient, MockRancherClient, MockRemoteClient, MockRemoteClientFactory,
};
use crate::reconciler::Reconciler;
use crds::{
    CapiCluster, CapiClusterSpec, CapiClusterStatus, ClusterRegistrationToken,
    ClusterRegistrationTokenSpec, ClusterRegistrationTokenStatus, RancherCluster,
    RancherClusterSpec, RancherClusterStatus,
};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use manifest_client::MockManifestFetcher;
use std::collections::BTreeMap;
use std::time::Duration;

pub const TEST_REQUEUE_AFTER: Duration = Duration::from_secs(60);

fn to_labels(labels: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    if labels.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Helper to create a test CAPI cluster
pub fn create_test_capi_cluster(
    name: &str,
    namespace: &str,
    control_plane_ready: bool,
    labels: &[(&str, &str)],
) -> CapiCluster {
    let mut cluster = CapiCluster::new(name, CapiClusterSpec::default());
    cluster.metadata = ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        uid: Some(format!("uid-{}", name)),
        resource_version: Some("1000".to_string()),
        labels: to_labels(labels),
        ..Default::default()
    };
    cluster.status = Some(CapiClusterStatus {
        control_plane_ready,
        ..Default::default()
    });
    cluster
}

/// Helper to create a test namespace
pub fn create_test_namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: to_labels(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a test Rancher cluster with the given status
pub fn create_test_rancher_cluster(
    name: &str,
    namespace: &str,
    cluster_name: Option<&str>,
    agent_deployed: bool,
) -> RancherCluster {
    let mut cluster = RancherCluster::new(name, RancherClusterSpec::default());
    cluster.metadata.namespace = Some(namespace.to_string());
    cluster.status = Some(RancherClusterStatus {
        cluster_name: cluster_name.unwrap_or_default().to_string(),
        agent_deployed,
        ready: agent_deployed,
    });
    cluster
}

/// Marks a test Rancher cluster as being deleted
pub fn mark_deleting(cluster: &mut RancherCluster) {
    cluster.metadata.deletion_timestamp =
        Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
    cluster.metadata.finalizers = Some(vec!["wrangler.cattle.io/cluster".to_string()]);
}

/// Helper to create a test registration token
pub fn create_test_token(
    cluster_name: &str,
    namespace: &str,
    manifest_url: Option<&str>,
) -> ClusterRegistrationToken {
    let mut token = ClusterRegistrationToken::new(
        cluster_name,
        ClusterRegistrationTokenSpec {
            cluster_name: cluster_name.to_string(),
        },
    );
    token.metadata.namespace = Some(namespace.to_string());
    token.status = manifest_url.map(|url| ClusterRegistrationTokenStatus {
        manifest_url: url.to_string(),
        ..Default::default()
    });
    token
}

/// Mocks behind a test reconciler, kept for assertions
pub struct TestClients {
    pub management: MockManagementClient,
    pub rancher: MockRancherClient,
    pub remote: MockRemoteClient,
    pub factory: MockRemoteClientFactory,
    pub manifests: MockManifestFetcher,
}

impl TestClients {
    pub fn new() -> Self {
        let remote = MockRemoteClient::new();
        Self {
            management: MockManagementClient::new(),
            rancher: MockRancherClient::new(),
            factory: MockRemoteClientFactory::new(remote.clone()),
            remote,
            manifests: MockManifestFetcher::new(),
        }
    }

    /// Create a reconciler sharing state with these mocks
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Box::new(self.management.clone()),
            Box::new(self.rancher.clone()),
            Box::new(self.factory.clone()),
            Box::new(self.manifests.clone()),
            TEST_REQUEUE_AFTER,
        )
    }
}
