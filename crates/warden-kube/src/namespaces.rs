//! Namespace operations and the deletion watch stream.

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, PostParams};
use kube::runtime::watcher;
use kube::ResourceExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use warden_core::repos::NamespaceRepository;
use warden_core::{CoreResult, NamespaceInfo, NamespacePhase};

use crate::{cluster_err, KubeClient};

fn phase_of(namespace: &Namespace) -> NamespacePhase {
    match namespace
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
    {
        Some("Active") => NamespacePhase::Active,
        Some("Terminating") => NamespacePhase::Terminating,
        _ => NamespacePhase::Unknown,
    }
}

fn namespace_body(name: &str) -> Namespace {
    let mut namespace = Namespace::default();
    namespace.metadata.name = Some(name.to_string());
    namespace
}

#[async_trait]
impl NamespaceRepository for KubeClient {
    /// Create the namespace. A 409 from the API server means it already
    /// exists, which is not an error here.
    async fn create(&self, name: &str) -> CoreResult<()> {
        let api: Api<Namespace> = Api::all(self.client());
        match api.create(&PostParams::default(), &namespace_body(name)).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ref err)) if err.code == 409 => {
                debug!(namespace = name, "namespace already exists");
                Ok(())
            }
            Err(e) => Err(cluster_err("creating namespace", e)),
        }
    }

    async fn delete(&self, name: &str) -> CoreResult<()> {
        let api: Api<Namespace> = Api::all(self.client());
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| cluster_err("deleting namespace", e))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> CoreResult<NamespaceInfo> {
        let api: Api<Namespace> = Api::all(self.client());
        let namespace = api
            .get(name)
            .await
            .map_err(|e| cluster_err("reading namespace", e))?;
        Ok(NamespaceInfo {
            name: name.to_string(),
            phase: phase_of(&namespace),
        })
    }

    async fn list(&self) -> CoreResult<Vec<NamespaceInfo>> {
        let api: Api<Namespace> = Api::all(self.client());
        let namespaces = api
            .list(&Default::default())
            .await
            .map_err(|e| cluster_err("listing namespaces", e))?;
        Ok(namespaces
            .items
            .iter()
            .map(|ns| NamespaceInfo {
                name: ns.name_any(),
                phase: phase_of(ns),
            })
            .collect())
    }

    /// Stream namespace deletion notifications through a channel. The
    /// watch restarts internally on relist, so the same namespace can be
    /// reported more than once.
    async fn watch_deleted(&self) -> CoreResult<mpsc::Receiver<String>> {
        let api: Api<Namespace> = Api::all(self.client());
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut stream = std::pin::pin!(watcher(api, watcher::Config::default()));
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::Delete(namespace)) => {
                        if tx.send(namespace.name_any()).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // The watcher backs off and resumes on its own.
                        warn!(%err, "namespace watch error");
                    }
                }
            }
            debug!("namespace deletion watch stopped");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_phase(phase: Option<&str>) -> Namespace {
        let mut namespace = namespace_body("team-a");
        if let Some(phase) = phase {
            namespace.status = Some(k8s_openapi::api::core::v1::NamespaceStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            });
        }
        namespace
    }

    #[test]
    fn phase_maps_cluster_strings() {
        assert_eq!(phase_of(&with_phase(Some("Active"))), NamespacePhase::Active);
        assert_eq!(
            phase_of(&with_phase(Some("Terminating"))),
            NamespacePhase::Terminating
        );
        assert_eq!(phase_of(&with_phase(Some("odd"))), NamespacePhase::Unknown);
        assert_eq!(phase_of(&with_phase(None)), NamespacePhase::Unknown);
    }
}
