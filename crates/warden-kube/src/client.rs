//! Kubernetes cluster connection management.

use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;
use warden_core::CoreResult;

use crate::cluster_err;

/// Default timeout for Kubernetes API requests.
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to a Kubernetes cluster, shared by every repository
/// implementation in this crate.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient").finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Connect using the ambient configuration: the in-cluster service
    /// account when running inside a pod, `$KUBECONFIG` otherwise. A
    /// context name overrides the kubeconfig's current context.
    pub async fn connect(context: Option<&str>) -> CoreResult<Self> {
        let mut config = match context {
            Some(context) => {
                let kubeconfig =
                    Kubeconfig::read().map_err(|e| cluster_err("reading kubeconfig", e))?;
                Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(context.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| cluster_err("loading kubeconfig context", e))?
            }
            None => Config::infer()
                .await
                .map_err(|e| cluster_err("inferring cluster configuration", e))?,
        };
        config.read_timeout = Some(DEFAULT_API_TIMEOUT);

        let client =
            Client::try_from(config).map_err(|e| cluster_err("building cluster client", e))?;
        debug!(context = context.unwrap_or("<inferred>"), "connected to cluster");
        Ok(Self { client })
    }

    /// Wrap an already-built client (used by tests against a mock API
    /// server).
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> Client {
        self.client.clone()
    }
}
