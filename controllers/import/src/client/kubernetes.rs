//! kube-rs backed client implementations.

use super::{ManagementClient, ObjectKey, RancherClient, RemoteClientFactory, RemoteClusterClient};
use crate::error::ControllerError;
use crate::manifest::ManifestObject;
use async_trait::async_trait;
use crds::{CapiCluster, ClusterRegistrationToken, RancherCluster};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, Scope};
use kube::{Client, Config, ResourceExt};
use tracing::debug;

/// Key holding the kubeconfig in the CAPI-generated secret.
const KUBECONFIG_SECRET_KEY: &str = "value";

/// Name of the secret CAPI writes the workload kubeconfig to.
pub fn kubeconfig_secret_name(cluster_name: &str) -> String {
    format!("{}-kubeconfig", cluster_name)
}

/// Management cluster client backed by `kube::Client`.
#[derive(Clone)]
pub struct KubeManagementClient {
    client: Client,
}

impl KubeManagementClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManagementClient for KubeManagementClient {
    async fn get_capi_cluster(&self, key: &ObjectKey) -> Result<Option<CapiCluster>, kube::Error> {
        let api: Api<CapiCluster> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, kube::Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get_opt(name).await
    }

    async fn patch_capi_cluster(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<(), kube::Error> {
        let api: Api<CapiCluster> = Api::namespaced(self.client.clone(), &key.namespace);
        api.patch(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}

/// Rancher resource client backed by `kube::Client`.
#[derive(Clone)]
pub struct KubeRancherClient {
    client: Client,
}

impl KubeRancherClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespace_of<K: ResourceExt>(resource: &K) -> Result<String, kube::Error> {
        resource.namespace().ok_or_else(|| {
            kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: format!("{} has no namespace", resource.name_any()),
                reason: "BadRequest".to_string(),
                code: 400,
            })
        })
    }
}

#[async_trait]
impl RancherClient for KubeRancherClient {
    async fn get_rancher_cluster(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<RancherCluster>, kube::Error> {
        let api: Api<RancherCluster> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await
    }

    async fn create_rancher_cluster(
        &self,
        cluster: &RancherCluster,
    ) -> Result<RancherCluster, kube::Error> {
        let namespace = Self::namespace_of(cluster)?;
        let api: Api<RancherCluster> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), cluster).await
    }

    async fn get_registration_token(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<ClusterRegistrationToken>, kube::Error> {
        let api: Api<ClusterRegistrationToken> =
            Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await
    }

    async fn create_registration_token(
        &self,
        token: &ClusterRegistrationToken,
    ) -> Result<ClusterRegistrationToken, kube::Error> {
        let namespace = Self::namespace_of(token)?;
        let api: Api<ClusterRegistrationToken> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), token).await
    }
}

/// Builds workload cluster clients from the `<cluster>-kubeconfig` secret.
///
/// A fresh client is built for every call; nothing is cached.
#[derive(Clone)]
pub struct KubeconfigSecretClientFactory {
    client: Client,
}

impl KubeconfigSecretClientFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn read_kubeconfig(&self, cluster: &CapiCluster) -> Result<Kubeconfig, ControllerError> {
        let namespace = cluster.namespace().ok_or_else(|| {
            ControllerError::InvalidResource(format!("cluster {} has no namespace", cluster.name_any()))
        })?;
        let secret_name = kubeconfig_secret_name(&cluster.name_any());

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        let secret = secrets.get(&secret_name).await?;

        let data = secret
            .data
            .as_ref()
            .and_then(|d| d.get(KUBECONFIG_SECRET_KEY))
            .ok_or_else(|| {
                ControllerError::Kubeconfig(format!(
                    "secret {}/{} has no {:?} key",
                    namespace, secret_name, KUBECONFIG_SECRET_KEY
                ))
            })?;

        let yaml = std::str::from_utf8(&data.0).map_err(|e| {
            ControllerError::Kubeconfig(format!("secret {}/{}: {}", namespace, secret_name, e))
        })?;

        Kubeconfig::from_yaml(yaml).map_err(|e| {
            ControllerError::Kubeconfig(format!("secret {}/{}: {}", namespace, secret_name, e))
        })
    }
}

#[async_trait]
impl RemoteClientFactory for KubeconfigSecretClientFactory {
    async fn client_for(
        &self,
        cluster: &CapiCluster,
    ) -> Result<Box<dyn RemoteClusterClient>, ControllerError> {
        let kubeconfig = self.read_kubeconfig(cluster).await?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ControllerError::Kubeconfig(e.to_string()))?;
        let client = Client::try_from(config)?;

        debug!("Built workload cluster client for {}", cluster.name_any());
        Ok(Box::new(DynamicRemoteClient { client }))
    }
}

/// Creates arbitrary manifest objects on a workload cluster.
struct DynamicRemoteClient {
    client: Client,
}

#[async_trait]
impl RemoteClusterClient for DynamicRemoteClient {
    async fn create(&self, object: &ManifestObject) -> Result<(), kube::Error> {
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &object.gvk()).await?;

        let api: Api<DynamicObject> = match capabilities.scope {
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
            Scope::Namespaced => Api::namespaced_with(
                self.client.clone(),
                object.namespace.as_deref().unwrap_or("default"),
                &resource,
            ),
        };

        api.create(&PostParams::default(), &object.object).await?;
        Ok(())
    }
}
