//! Rancher `ClusterRegistrationToken`
//!
//! Issued per management cluster. Once Rancher has processed it, the status
//! carries the URL of the agent registration manifest.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "management.cattle.io",
    version = "v3",
    kind = "ClusterRegistrationToken",
    namespaced,
    status = "ClusterRegistrationTokenStatus",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationTokenSpec {
    /// Management cluster the token registers agents for
    #[serde(default)]
    pub cluster_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationTokenStatus {
    /// URL serving the agent registration manifest
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub insecure_command: String,
}

impl ClusterRegistrationToken {
    /// Manifest URL from status, if Rancher has published one.
    pub fn manifest_url(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.manifest_url.as_str())
            .filter(|url| !url.is_empty())
    }
}
