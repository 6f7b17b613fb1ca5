//! In-memory client implementations for unit testing the reconciler
//!
//! Every mock records the writes it receives so tests can assert on exactly
//! what the reconciler did.

use super::{ManagementClient, ObjectKey, RancherClient, RemoteClientFactory, RemoteClusterClient};
use crate::error::ControllerError;
use crate::manifest::ManifestObject;
use async_trait::async_trait;
use crds::{CapiCluster, ClusterRegistrationToken, RancherCluster};
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn key_of<K: ResourceExt>(resource: &K) -> ObjectKey {
    ObjectKey::new(resource.namespace().unwrap_or_default(), resource.name_any())
}

/// Mock ManagementClient
#[derive(Clone, Default)]
pub struct MockManagementClient {
    clusters: Arc<Mutex<HashMap<ObjectKey, CapiCluster>>>,
    namespaces: Arc<Mutex<HashMap<String, Namespace>>>,
    patches: Arc<Mutex<Vec<(ObjectKey, serde_json::Value)>>>,
    fail_get: Arc<Mutex<bool>>,
    fail_patch: Arc<Mutex<bool>>,
}

impl MockManagementClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CAPI cluster to the mock store (for test setup)
    pub fn add_cluster(&self, cluster: CapiCluster) {
        self.clusters.lock().unwrap().insert(key_of(&cluster), cluster);
    }

    /// Add a namespace to the mock store (for test setup)
    pub fn add_namespace(&self, namespace: Namespace) {
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.name_any(), namespace);
    }

    /// Make every cluster lookup fail with a server error
    pub fn fail_get(&self) {
        *self.fail_get.lock().unwrap() = true;
    }

    /// Make every patch fail with a conflict
    pub fn fail_patch(&self) {
        *self.fail_patch.lock().unwrap() = true;
    }

    /// Patches received so far, in order
    pub fn patches(&self) -> Vec<(ObjectKey, serde_json::Value)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManagementClient for MockManagementClient {
    async fn get_capi_cluster(&self, key: &ObjectKey) -> Result<Option<CapiCluster>, kube::Error> {
        if *self.fail_get.lock().unwrap() {
            return Err(api_error(500, "InternalError", "etcd unavailable".to_string()));
        }
        Ok(self.clusters.lock().unwrap().get(key).cloned())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, kube::Error> {
        Ok(self.namespaces.lock().unwrap().get(name).cloned())
    }

    async fn patch_capi_cluster(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), kube::Error> {
        self.patches
            .lock()
            .unwrap()
            .push((key.clone(), patch.clone()));
        if *self.fail_patch.lock().unwrap() {
            return Err(api_error(
                409,
                "Conflict",
                format!("the object {} has been modified", key),
            ));
        }
        Ok(())
    }
}

/// Mock RancherClient
#[derive(Clone, Default)]
pub struct MockRancherClient {
    clusters: Arc<Mutex<HashMap<ObjectKey, RancherCluster>>>,
    tokens: Arc<Mutex<HashMap<ObjectKey, ClusterRegistrationToken>>>,
    created_clusters: Arc<Mutex<Vec<RancherCluster>>>,
    created_tokens: Arc<Mutex<Vec<ClusterRegistrationToken>>>,
}

impl MockRancherClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Rancher cluster to the mock store (for test setup)
    pub fn add_cluster(&self, cluster: RancherCluster) {
        self.clusters.lock().unwrap().insert(key_of(&cluster), cluster);
    }

    /// Add a registration token to the mock store (for test setup)
    pub fn add_token(&self, token: ClusterRegistrationToken) {
        self.tokens.lock().unwrap().insert(key_of(&token), token);
    }

    /// Rancher clusters created through the client
    pub fn created_clusters(&self) -> Vec<RancherCluster> {
        self.created_clusters.lock().unwrap().clone()
    }

    /// Registration tokens created through the client
    pub fn created_tokens(&self) -> Vec<ClusterRegistrationToken> {
        self.created_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl RancherClient for MockRancherClient {
    async fn get_rancher_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RancherCluster>, kube::Error> {
        Ok(self.clusters.lock().unwrap().get(key).cloned())
    }

    async fn create_rancher_cluster(
        &self,
        cluster: &RancherCluster,
    ) -> Result<RancherCluster, kube::Error> {
        let key = key_of(cluster);
        let mut clusters = self.clusters.lock().unwrap();
        if clusters.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{} already exists", key)));
        }
        clusters.insert(key, cluster.clone());
        self.created_clusters.lock().unwrap().push(cluster.clone());
        Ok(cluster.clone())
    }

    async fn get_registration_token(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<ClusterRegistrationToken>, kube::Error> {
        Ok(self.tokens.lock().unwrap().get(key).cloned())
    }

    async fn create_registration_token(
        &self,
        token: &ClusterRegistrationToken,
    ) -> Result<ClusterRegistrationToken, kube::Error> {
        let key = key_of(token);
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{} already exists", key)));
        }
        tokens.insert(key, token.clone());
        self.created_tokens.lock().unwrap().push(token.clone());
        Ok(token.clone())
    }
}

/// Mock RemoteClusterClient
///
/// Objects are identified by (kind, name). Pre-registered objects answer
/// with `AlreadyExists`.
#[derive(Clone, Default)]
pub struct MockRemoteClient {
    existing: Arc<Mutex<HashSet<(String, String)>>>,
    failing: Arc<Mutex<HashSet<(String, String)>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object that already exists on the workload cluster
    pub fn add_existing(&self, kind: &str, name: &str) {
        self.existing
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()));
    }

    /// Make creation of an object fail with a server error
    pub fn fail_on(&self, kind: &str, name: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()));
    }

    /// Every create call as (kind, name), in order
    pub fn create_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClusterClient for MockRemoteClient {
    async fn create(&self, object: &ManifestObject) -> Result<(), kube::Error> {
        let id = (object.kind.clone(), object.display_name().to_string());
        self.calls.lock().unwrap().push(id.clone());

        if self.failing.lock().unwrap().contains(&id) {
            return Err(api_error(500, "InternalError", "admission webhook failed".to_string()));
        }

        // Generated names never collide
        if object.name.is_none() {
            return Ok(());
        }

        let mut existing = self.existing.lock().unwrap();
        if !existing.insert(id) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} {} already exists", object.kind, object.display_name()),
            ));
        }
        Ok(())
    }
}

/// Mock RemoteClientFactory handing out clones of one `MockRemoteClient`
#[derive(Clone, Default)]
pub struct MockRemoteClientFactory {
    client: MockRemoteClient,
    requests: Arc<Mutex<Vec<String>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockRemoteClientFactory {
    pub fn new(client: MockRemoteClient) -> Self {
        Self {
            client,
            ..Default::default()
        }
    }

    /// Make client construction fail as if the kubeconfig secret were missing
    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// Names of the clusters clients were requested for
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClientFactory for MockRemoteClientFactory {
    async fn client_for(
        &self,
        cluster: &CapiCluster,
    ) -> Result<Box<dyn RemoteClusterClient>, ControllerError> {
        self.requests.lock().unwrap().push(cluster.name_any());
        if *self.fail.lock().unwrap() {
            return Err(ControllerError::Kubeconfig(format!(
                "secret {}-kubeconfig not found",
                cluster.name_any()
            )));
        }
        Ok(Box::new(self.client.clone()))
    }
}
