//! Kubernetes API client
//!
//! Wraps the kube crate to provide the pod listing the locator needs.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams},
    Client, Config,
};

use super::config::resolve_config;
use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// Anything that can list pods in a namespace
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_pods(&self, namespace: &str, params: &ListParams) -> Result<Vec<Pod>, kube::Error>;
}

#[async_trait]
impl PodLister for Client {
    async fn list_pods(&self, namespace: &str, params: &ListParams) -> Result<Vec<Pod>, kube::Error> {
        let pods: Api<Pod> = Api::namespaced(self.clone(), namespace);
        Ok(pods.list(params).await?.items)
    }
}

/// Build a kube client from a resolved config.
///
/// Installs the aws-lc-rs crypto provider first; kube's default features
/// also compile in ring, so rustls cannot pick one on its own.
pub fn build_client(config: Config) -> Result<Client, RemoteError> {
    // Err only means a provider is already installed for this process
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    Client::try_from(config).map_err(RemoteError::TransportConstruction)
}

/// Kubernetes API client handle
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Create a new client from the given settings.
    ///
    /// Credentials are resolved on every call; clients are not cached.
    pub async fn connect(remote: &RemoteConfig) -> Result<Self, RemoteError> {
        let start = std::time::Instant::now();
        let config = resolve_config(remote).await?;
        tracing::debug!("Config loaded in {:?}", start.elapsed());

        let client = build_client(config)?;
        tracing::debug!("Client created in {:?}", start.elapsed());

        Ok(Self { client })
    }

    /// Wrap an existing kube client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the raw kube client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PodLister for KubeClient {
    async fn list_pods(&self, namespace: &str, params: &ListParams) -> Result<Vec<Pod>, kube::Error> {
        let start = std::time::Instant::now();
        let pods = self.client.list_pods(namespace, params).await?;
        tracing::debug!("list_pods({}) API call took {:?}", namespace, start.elapsed());
        Ok(pods)
    }
}
