//! Cluster credential resolution
//!
//! Turns a [`RemoteConfig`] into a `kube::Config`. Loading and merging of
//! kubeconfig files is left to the kube crate; this module only decides
//! which loader to call and with which override.

use kube::config::{InferConfigError, KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::Config;
use thiserror::Error;

use super::GADGET_NAMESPACE;
use crate::config::RemoteConfig;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] KubeconfigError),
    #[error("Failed to infer config: {0}")]
    Infer(#[from] InferConfigError),
}

/// Resolve a fresh cluster config.
///
/// An explicit kubeconfig path wins; otherwise a configured context is
/// looked up in the default kubeconfig; otherwise the config is inferred
/// (in-cluster service account or the default kubeconfig).
pub async fn resolve_config(remote: &RemoteConfig) -> Result<Config, CredentialError> {
    let options = KubeConfigOptions {
        context: remote.context.clone(),
        ..Default::default()
    };

    let config = match (&remote.kubeconfig, &remote.context) {
        (Some(path), _) => {
            tracing::debug!("Loading kubeconfig from {:?}", path);
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        (None, Some(context)) => {
            tracing::debug!("Loading default kubeconfig with context {}", context);
            Config::from_kubeconfig(&options).await?
        }
        (None, None) => Config::infer().await?,
    };

    Ok(config)
}

/// Adjust a resolved config for streaming exec requests.
///
/// Exec streams stay open until the remote process exits, so the client
/// read timeout is cleared.
pub fn apply_exec_defaults(config: &mut Config) {
    config.default_namespace = GADGET_NAMESPACE.to_string();
    config.read_timeout = None;
}
