//! Applying rendered config sets to the cluster.
//!
//! Each rendered config is parsed as multi-document YAML; every document
//! is applied server-side through the discovery API as a `DynamicObject`,
//! so the playbook is not limited to a fixed set of resource kinds.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use serde::Deserialize;
use kube::core::GroupVersionKind;
use kube::discovery::{self, Scope};
use tracing::{debug, info};
use warden_core::repos::ClusterRepository;
use warden_core::{ClusterVersion, Config, CoreError, CoreResult};

use crate::{cluster_err, KubeClient};

/// Field manager recorded on every server-side apply.
const FIELD_MANAGER: &str = "warden";

/// API surface this binary was compiled against.
const CLIENT_API_VERSION: &str = "v1.31";

/// Split one rendered config into its non-empty YAML documents, as JSON
/// values.
pub fn split_documents(config: &Config) -> CoreResult<Vec<serde_json::Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&config.content) {
        let value: serde_json::Value =
            serde_json::Value::deserialize(document).map_err(|e| CoreError::Template {
                name: config.name.clone(),
                message: format!("rendered output is not valid YAML: {e}"),
            })?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

fn gvk_of(manifest: &serde_json::Value, config_name: &str) -> CoreResult<GroupVersionKind> {
    let api_version = manifest
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::Template {
            name: config_name.to_string(),
            message: "manifest missing apiVersion".to_string(),
        })?;
    let kind = manifest
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::Template {
            name: config_name.to_string(),
            message: "manifest missing kind".to_string(),
        })?;

    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };
    Ok(GroupVersionKind::gvk(group, version, kind))
}

fn name_of(manifest: &serde_json::Value, config_name: &str) -> CoreResult<String> {
    manifest
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::Template {
            name: config_name.to_string(),
            message: "manifest missing metadata.name".to_string(),
        })
}

/// Namespaced manifests without an explicit namespace are applied to the
/// target namespace.
fn force_namespace(manifest: &mut serde_json::Value, namespace: &str) {
    if let Some(metadata) = manifest
        .get_mut("metadata")
        .and_then(|m| m.as_object_mut())
    {
        metadata
            .entry("namespace")
            .or_insert_with(|| serde_json::Value::String(namespace.to_string()));
    }
}

impl KubeClient {
    async fn apply_manifest(
        &self,
        namespace: &str,
        config_name: &str,
        mut manifest: serde_json::Value,
    ) -> CoreResult<()> {
        let gvk = gvk_of(&manifest, config_name)?;
        let name = name_of(&manifest, config_name)?;

        let (resource, capabilities) = discovery::oneshot::pinned_kind(&self.client(), &gvk)
            .await
            .map_err(|e| cluster_err("discovering resource type", e))?;

        let api: Api<DynamicObject> = match capabilities.scope {
            Scope::Namespaced => {
                force_namespace(&mut manifest, namespace);
                let target = manifest
                    .pointer("/metadata/namespace")
                    .and_then(|v| v.as_str())
                    .unwrap_or(namespace)
                    .to_string();
                Api::namespaced_with(self.client(), &target, &resource)
            }
            Scope::Cluster => Api::all_with(self.client(), &resource),
        };

        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&name, &params, &Patch::Apply(&manifest))
            .await
            .map_err(|e| cluster_err(&format!("applying {}/{name}", gvk.kind), e))?;

        debug!(kind = %gvk.kind, %name, %namespace, "manifest applied");
        Ok(())
    }
}

#[async_trait]
impl ClusterRepository for KubeClient {
    async fn apply(&self, namespace: &str, configs: &[Config]) -> CoreResult<()> {
        let mut applied = 0usize;
        for config in configs {
            for manifest in split_documents(config)? {
                self.apply_manifest(namespace, &config.name, manifest)
                    .await?;
                applied += 1;
            }
        }
        info!(%namespace, manifests = applied, "config set applied to cluster");
        Ok(())
    }

    async fn version(&self) -> CoreResult<ClusterVersion> {
        let info = self
            .client()
            .apiserver_version()
            .await
            .map_err(|e| cluster_err("reading API server version", e))?;
        Ok(ClusterVersion {
            client: CLIENT_API_VERSION.to_string(),
            server: info.git_version,
        })
    }
}
