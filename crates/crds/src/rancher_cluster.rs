//! Rancher provisioning `Cluster`
//!
//! Rancher's v2 provisioning representation of a downstream cluster. The
//! import controller creates an empty one per eligible CAPI cluster; Rancher's
//! own controllers fill in the status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "provisioning.cattle.io",
    version = "v1",
    kind = "Cluster",
    root = "RancherCluster",
    namespaced,
    status = "RancherClusterStatus",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct RancherClusterSpec {
    /// Kubernetes version, only set for Rancher-provisioned clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// RKE2/K3s configuration, opaque to this controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rke_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RancherClusterStatus {
    /// Name of the management cluster Rancher generated (e.g. "c-m-abc123")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    /// Whether the cattle cluster agent has registered
    #[serde(default)]
    pub agent_deployed: bool,

    #[serde(default)]
    pub ready: bool,
}

impl RancherCluster {
    /// Management cluster name from status, if Rancher has assigned one yet.
    pub fn management_cluster_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.cluster_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Whether the agent reported itself as deployed.
    pub fn agent_deployed(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.agent_deployed)
    }

    /// Whether the object is being deleted.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
