//! Cluster API `Cluster`
//!
//! The management-cluster definition of a workload cluster. Owned by the CAPI
//! controllers; the import controller only reads it and adds annotations.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reported by CAPI once the control plane is initialized and ready.
pub const CONTROL_PLANE_READY_CONDITION: &str = "ControlPlaneReady";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    root = "CapiCluster",
    namespaced,
    status = "CapiClusterStatus",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct CapiClusterSpec {
    /// Whether reconciliation of this cluster is paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    /// Endpoint used to reach the workload cluster's API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,

    /// Reference to the control plane provider object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_ref: Option<ClusterObjectReference>,

    /// Reference to the infrastructure provider object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ClusterObjectReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Hostname or IP of the API server
    #[serde(default)]
    pub host: String,

    /// Port of the API server
    #[serde(default)]
    pub port: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CapiClusterStatus {
    /// Lifecycle phase (Pending, Provisioning, Provisioned, Deleting, Failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Whether the infrastructure is ready
    #[serde(default)]
    pub infrastructure_ready: bool,

    /// Whether the control plane is ready
    #[serde(default)]
    pub control_plane_ready: bool,

    /// Observed conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// A CAPI condition.
///
/// Differs from `metav1.Condition`: it carries a severity and has no
/// `observedGeneration`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,

    /// "True", "False" or "Unknown"
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl CapiCluster {
    /// Returns true if the named condition is present with status "True".
    pub fn condition_is_true(&self, condition_type: &str) -> bool {
        self.status.as_ref().is_some_and(|status| {
            status
                .conditions
                .iter()
                .any(|c| c.type_ == condition_type && c.status == "True")
        })
    }

    /// Whether the control plane is ready, by flag or by condition.
    pub fn is_control_plane_ready(&self) -> bool {
        let flag = self
            .status
            .as_ref()
            .is_some_and(|status| status.control_plane_ready);
        flag || self.condition_is_true(CONTROL_PLANE_READY_CONDITION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn test_resource_type() {
        assert_eq!(CapiCluster::kind(&()), "Cluster");
        assert_eq!(CapiCluster::api_version(&()), "cluster.x-k8s.io/v1beta1");
        assert_eq!(CapiCluster::plural(&()), "clusters");
    }

    fn cluster_with_status(status: Option<CapiClusterStatus>) -> CapiCluster {
        let mut cluster = CapiCluster::new("workload", CapiClusterSpec::default());
        cluster.status = status;
        cluster
    }

    #[test]
    fn test_control_plane_not_ready_without_status() {
        assert!(!cluster_with_status(None).is_control_plane_ready());
    }

    #[test]
    fn test_control_plane_ready_by_flag() {
        let cluster = cluster_with_status(Some(CapiClusterStatus {
            control_plane_ready: true,
            ..Default::default()
        }));
        assert!(cluster.is_control_plane_ready());
    }

    #[test]
    fn test_control_plane_ready_by_condition() {
        let cluster = cluster_with_status(Some(CapiClusterStatus {
            conditions: vec![Condition {
                type_: CONTROL_PLANE_READY_CONDITION.to_string(),
                status: "True".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }));
        assert!(cluster.is_control_plane_ready());
    }

    #[test]
    fn test_control_plane_condition_false() {
        let cluster = cluster_with_status(Some(CapiClusterStatus {
            conditions: vec![Condition {
                type_: CONTROL_PLANE_READY_CONDITION.to_string(),
                status: "False".to_string(),
                reason: Some("WaitingForControlPlane".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }));
        assert!(!cluster.is_control_plane_ready());
    }

    #[test]
    fn test_deserialize_capi_cluster() {
        let json = serde_json::json!({
            "apiVersion": "cluster.x-k8s.io/v1beta1",
            "kind": "Cluster",
            "metadata": {"name": "workload", "namespace": "capi", "uid": "1234"},
            "spec": {
                "controlPlaneEndpoint": {"host": "10.0.0.1", "port": 6443},
                "clusterNetwork": {"pods": {"cidrBlocks": ["192.168.0.0/16"]}}
            },
            "status": {
                "phase": "Provisioned",
                "controlPlaneReady": true,
                "conditions": [{"type": "Ready", "status": "True", "lastTransitionTime": "2024-01-01T00:00:00Z"}]
            }
        });
        let cluster: CapiCluster = serde_json::from_value(json).unwrap();
        assert_eq!(cluster.metadata.uid.as_deref(), Some("1234"));
        assert_eq!(cluster.spec.control_plane_endpoint.as_ref().unwrap().port, 6443);
        assert!(cluster.is_control_plane_ready());
    }
}
