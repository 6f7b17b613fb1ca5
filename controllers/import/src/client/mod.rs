//! Client abstractions used by the reconciler.
//!
//! The reconciler only talks to the cluster through these traits so tests can
//! substitute in-memory implementations:
//! - `ManagementClient`: CAPI clusters and namespaces on the management cluster
//! - `RancherClient`: Rancher provisioning clusters and registration tokens
//! - `RemoteClientFactory`: builds a `RemoteClusterClient` for a workload cluster

pub mod kubernetes;
#[cfg(test)]
pub mod mock;

use crate::error::ControllerError;
use crate::manifest::ManifestObject;
use async_trait::async_trait;
use crds::{CapiCluster, ClusterRegistrationToken, RancherCluster};
use k8s_openapi::api::core::v1::Namespace;
use std::fmt;

pub use self::kubernetes::{
    KubeManagementClient, KubeRancherClient, KubeconfigSecretClientFactory,
};

/// Namespace and name of a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Access to CAPI clusters and namespaces on the management cluster.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Get a CAPI cluster. `Ok(None)` when it does not exist.
    async fn get_capi_cluster(&self, key: &ObjectKey)
        -> Result<Option<CapiCluster>, kube::Error>;

    /// Get a namespace. `Ok(None)` when it does not exist.
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, kube::Error>;

    /// Apply a JSON merge patch to a CAPI cluster.
    async fn patch_capi_cluster(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), kube::Error>;
}

/// Access to Rancher resources on the management cluster.
#[async_trait]
pub trait RancherClient: Send + Sync {
    async fn get_rancher_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RancherCluster>, kube::Error>;

    async fn create_rancher_cluster(
        &self,
        cluster: &RancherCluster,
    ) -> Result<RancherCluster, kube::Error>;

    async fn get_registration_token(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<ClusterRegistrationToken>, kube::Error>;

    async fn create_registration_token(
        &self,
        token: &ClusterRegistrationToken,
    ) -> Result<ClusterRegistrationToken, kube::Error>;
}

/// Creates objects on a workload cluster.
#[async_trait]
pub trait RemoteClusterClient: Send + Sync {
    /// Create one manifest object. Existing objects surface as a 409 error.
    async fn create(&self, object: &ManifestObject) -> Result<(), kube::Error>;
}

/// Builds a client for the workload cluster behind a CAPI cluster.
#[async_trait]
pub trait RemoteClientFactory: Send + Sync {
    async fn client_for(
        &self,
        cluster: &CapiCluster,
    ) -> Result<Box<dyn RemoteClusterClient>, ControllerError>;
}

/// True when the API server rejected a create because the object exists.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists")
}
