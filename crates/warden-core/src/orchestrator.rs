//! Namespace orchestrator — the one entry point the HTTP and CLI surfaces
//! drive.
//!
//! Each operation composes the inventory and config services with the
//! cluster repositories. The orchestrator owns the cross-collaborator
//! ordering rules (cluster namespace before inventory on create, cluster
//! delete before local cleanup on delete) and the one deliberate error
//! recovery in the system: an `AlreadyExists` inventory during `create`
//! is logged and the existing inventory is used.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ConfigService;
use crate::error::{CoreError, CoreResult};
use crate::inventory::InventoryService;
use crate::repos::{
    ClusterRepository, ConfigRepository, DeploymentRepository, InventoryRepository, JobRepository,
    NamespaceRepository, PlaybookRepository, PodRepository, ServiceRepository,
};
use crate::types::{
    ready_percent, DeploymentInfo, Inventory, NamespaceInfo, NamespaceStatus, PodPhase,
    ServiceInfo, VersionInfo,
};
use crate::watcher::DeletionReconciler;

/// Repository set the orchestrator is built from. Collected in one struct
/// so backends can be swapped wholesale (file + kube in production, memory
/// in tests).
#[derive(Clone)]
pub struct Repositories {
    pub playbooks: Arc<dyn PlaybookRepository>,
    pub inventories: Arc<dyn InventoryRepository>,
    pub configs: Arc<dyn ConfigRepository>,
    pub namespaces: Arc<dyn NamespaceRepository>,
    pub pods: Arc<dyn PodRepository>,
    pub deployments: Arc<dyn DeploymentRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub cluster: Arc<dyn ClusterRepository>,
}

#[derive(Clone)]
pub struct Orchestrator {
    inventory: InventoryService,
    config: ConfigService,
    repos: Repositories,
}

impl Orchestrator {
    pub fn new(repos: Repositories) -> Self {
        Self {
            inventory: InventoryService::new(repos.inventories.clone(), repos.playbooks.clone()),
            config: ConfigService::new(repos.configs.clone(), repos.playbooks.clone()),
            repos,
        }
    }

    /// Build the deletion reconciler that keeps local bookkeeping in sync
    /// with cluster-side namespace deletion.
    pub fn reconciler(&self) -> DeletionReconciler {
        DeletionReconciler::new(
            self.repos.inventories.clone(),
            self.repos.configs.clone(),
        )
    }

    // ── Provisioning ───────────────────────────────────────────────

    /// Provision a namespace end to end: cluster namespace, inventory
    /// seeded from defaults, rendered config set, configs applied.
    ///
    /// An inventory that already exists is reused rather than treated as
    /// fatal, which makes `create` safe to re-run. Any other failure after
    /// the cluster namespace exists leaves it in place; it shows up as
    /// `managed = false` until a later `create` succeeds.
    pub async fn create(&self, namespace: &str) -> CoreResult<Inventory> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }

        self.repos.namespaces.create(namespace).await?;

        let inventory = match self.inventory.create(namespace).await {
            Ok(inventory) => inventory,
            Err(CoreError::AlreadyExists(_)) => {
                warn!(%namespace, "inventory already exists, reusing it");
                self.inventory.get(namespace).await?
            }
            Err(err) => return Err(err),
        };

        let configs = self.config.generate(&inventory).await?;
        self.repos.cluster.apply(namespace, &configs).await?;

        info!(%namespace, configs = configs.len(), "namespace provisioned");
        Ok(inventory)
    }

    /// Replace the namespace's inventory, re-render, and apply.
    pub async fn update(&self, namespace: &str, inventory: Inventory) -> CoreResult<Inventory> {
        self.inventory.update(namespace, inventory).await?;
        let stored = self.inventory.get(namespace).await?;

        let configs = self.config.generate(&stored).await?;
        self.repos.cluster.apply(namespace, &configs).await?;

        info!(%namespace, "namespace updated");
        Ok(stored)
    }

    /// Reset the namespace's inventory to the playbook defaults, re-render,
    /// and apply.
    pub async fn reset(&self, namespace: &str) -> CoreResult<Inventory> {
        let inventory = self.inventory.reset(namespace).await?;

        let configs = self.config.generate(&inventory).await?;
        self.repos.cluster.apply(namespace, &configs).await?;

        info!(%namespace, "namespace reset to defaults");
        Ok(inventory)
    }

    /// Re-render the namespace's current inventory and apply the result,
    /// without touching stored parameters.
    pub async fn apply(&self, namespace: &str) -> CoreResult<()> {
        let inventory = self.inventory.get(namespace).await?;

        let configs = self.config.generate(&inventory).await?;
        self.repos.cluster.apply(namespace, &configs).await?;

        info!(%namespace, "configs applied");
        Ok(())
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Delete the cluster namespace. Without `wait`, local bookkeeping is
    /// removed in the same call. With `wait`, local records are kept until
    /// the deletion reconciler observes the cluster-side removal, which
    /// only happens after the namespace's resources finish terminating.
    pub async fn delete(&self, namespace: &str, wait: bool) -> CoreResult<()> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }

        self.repos.namespaces.delete(namespace).await?;

        if wait {
            info!(%namespace, "namespace deletion issued, local cleanup deferred");
        } else {
            self.cleanup_local(namespace).await?;
            info!(%namespace, "namespace deleted, local state removed");
        }
        Ok(())
    }

    /// Delete a single batch job in a namespace.
    pub async fn delete_resource(&self, namespace: &str, job: &str) -> CoreResult<()> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }
        if job.is_empty() {
            return Err(CoreError::Validation("job name cannot be empty".to_string()));
        }
        self.repos.jobs.delete(namespace, job).await?;
        info!(%namespace, %job, "job deleted");
        Ok(())
    }

    /// Remove the namespace's inventory and config set. Idempotent: absent
    /// records are not an error.
    async fn cleanup_local(&self, namespace: &str) -> CoreResult<()> {
        match self.inventory.delete(namespace).await {
            Ok(()) | Err(CoreError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        self.config.delete(namespace).await
    }

    // ── Status & reads ─────────────────────────────────────────────

    /// All cluster namespaces with aggregate health, ordered by name.
    ///
    /// Works from the single `list()` snapshot: phases come from the
    /// listed entries, so a namespace garbage-collected mid-listing does
    /// not fail the whole read.
    pub async fn list_namespaces(&self) -> CoreResult<Vec<NamespaceStatus>> {
        let mut infos = self.repos.namespaces.list().await?;
        infos.sort_by(|a, b| a.name.cmp(&b.name));

        let mut statuses = Vec::with_capacity(infos.len());
        for info in infos {
            statuses.push(self.status_of(info).await?);
        }
        Ok(statuses)
    }

    /// Aggregate health of one namespace.
    pub async fn namespace_status(&self, namespace: &str) -> CoreResult<NamespaceStatus> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }
        let info = self.repos.namespaces.get(namespace).await?;
        self.status_of(info).await
    }

    async fn status_of(&self, info: NamespaceInfo) -> CoreResult<NamespaceStatus> {
        let namespace = info.name.as_str();
        let pods = self.repos.pods.list(namespace).await?;

        let running = pods
            .iter()
            .filter(|pod| pod.phase == PodPhase::Running)
            .count();
        let managed = self.repos.inventories.exists(namespace).await?;

        Ok(NamespaceStatus {
            name: info.name,
            phase: info.phase,
            status: ready_percent(running, pods.len()),
            managed,
        })
    }

    pub async fn get_inventory(&self, namespace: &str) -> CoreResult<Inventory> {
        self.inventory.get(namespace).await
    }

    pub async fn list_inventories(&self) -> CoreResult<Vec<Inventory>> {
        self.inventory.list().await
    }

    /// The playbook's current default parameter set.
    pub async fn defaults(&self) -> CoreResult<Inventory> {
        self.repos.playbooks.defaults().await
    }

    pub async fn list_services(&self, namespace: &str) -> CoreResult<Vec<ServiceInfo>> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }
        self.repos.services.list(namespace).await
    }

    pub async fn list_deployments(&self, namespace: &str) -> CoreResult<Vec<DeploymentInfo>> {
        if namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }
        self.repos.deployments.list(namespace).await
    }

    /// Subscribe to cluster-side namespace deletion notifications, for
    /// feeding the [`DeletionReconciler`].
    pub async fn watch_deleted(&self) -> CoreResult<tokio::sync::mpsc::Receiver<String>> {
        self.repos.namespaces.watch_deleted().await
    }

    /// Tool version plus the cluster API client/server versions.
    pub async fn version(&self) -> CoreResult<VersionInfo> {
        let cluster = self.repos.cluster.version().await?;
        Ok(VersionInfo {
            warden: env!("CARGO_PKG_VERSION").to_string(),
            client: cluster.client,
            server: cluster.server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCluster, MemoryConfigs, MemoryInventories, MemoryPlaybook};
    use crate::types::{NamespacePhase, PodInfo};

    fn playbook() -> MemoryPlaybook {
        MemoryPlaybook::new()
            .with_template("deployment", "replicas: {{.Values.replicas}}")
            .with_defaults(serde_json::json!({"replicas": 1}))
    }

    struct Harness {
        orch: Orchestrator,
        cluster: Arc<MemoryCluster>,
        configs: Arc<MemoryConfigs>,
        inventories: Arc<MemoryInventories>,
    }

    fn harness() -> Harness {
        harness_with(playbook())
    }

    fn harness_with(playbook: MemoryPlaybook) -> Harness {
        let cluster = Arc::new(MemoryCluster::new());
        let configs = Arc::new(MemoryConfigs::default());
        let inventories = Arc::new(MemoryInventories::default());
        let orch = Orchestrator::new(Repositories {
            playbooks: Arc::new(playbook),
            inventories: inventories.clone(),
            configs: configs.clone(),
            namespaces: cluster.clone(),
            pods: cluster.clone(),
            deployments: cluster.clone(),
            services: cluster.clone(),
            jobs: cluster.clone(),
            cluster: cluster.clone(),
        });
        Harness {
            orch,
            cluster,
            configs,
            inventories,
        }
    }

    #[tokio::test]
    async fn create_provisions_namespace_inventory_and_configs() {
        let h = harness();

        let inv = h.orch.create("team-a").await.unwrap();
        assert_eq!(inv.values["replicas"], serde_json::json!(1));

        assert!(h.cluster.has_namespace("team-a"));
        assert!(h.inventories.exists("team-a").await.unwrap());

        let applied = h.cluster.applied("team-a").unwrap();
        assert_eq!(applied[0].content, "replicas: 1");
        assert_eq!(h.configs.set("team-a"), Some(applied));
    }

    #[tokio::test]
    async fn create_twice_reuses_the_existing_inventory() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();

        // Customize, then re-run create. The customization must survive.
        let body = Inventory {
            namespace: "team-a".to_string(),
            values: serde_json::from_value(serde_json::json!({"replicas": 7})).unwrap(),
        };
        h.orch.update("team-a", body).await.unwrap();

        let inv = h.orch.create("team-a").await.unwrap();
        assert_eq!(inv.values["replicas"], serde_json::json!(7));
        assert_eq!(
            h.cluster.applied("team-a").unwrap()[0].content,
            "replicas: 7"
        );
    }

    #[tokio::test]
    async fn create_render_failure_leaves_orphan_namespace_unmanaged() {
        let broken = MemoryPlaybook::new()
            .with_template("broken", "{{ .Values.x")
            .with_defaults(serde_json::json!({}));
        let h = harness_with(broken);

        let err = h.orch.create("team-a").await.unwrap_err();
        assert!(matches!(err, CoreError::Template { .. }));

        // The cluster namespace stays; status reports it unmanaged only
        // once the reconciler or a delete removes the inventory. Here the
        // inventory was created before rendering failed.
        assert!(h.cluster.has_namespace("team-a"));
        assert!(h.cluster.applied("team-a").is_none());
    }

    #[tokio::test]
    async fn update_rerenders_and_applies() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();

        let body = Inventory {
            namespace: "ignored".to_string(),
            values: serde_json::from_value(serde_json::json!({"replicas": 3})).unwrap(),
        };
        let stored = h.orch.update("team-a", body).await.unwrap();
        assert_eq!(stored.namespace, "team-a");
        assert_eq!(
            h.cluster.applied("team-a").unwrap()[0].content,
            "replicas: 3"
        );
    }

    #[tokio::test]
    async fn update_missing_inventory_is_not_found() {
        let h = harness();
        let body = Inventory {
            namespace: "ghost".to_string(),
            values: Default::default(),
        };
        let err = h.orch.update("ghost", body).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_applies() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();
        let body = Inventory {
            namespace: "team-a".to_string(),
            values: serde_json::from_value(serde_json::json!({"replicas": 9})).unwrap(),
        };
        h.orch.update("team-a", body).await.unwrap();

        let reset = h.orch.reset("team-a").await.unwrap();
        assert_eq!(reset.values["replicas"], serde_json::json!(1));
        assert_eq!(
            h.cluster.applied("team-a").unwrap()[0].content,
            "replicas: 1"
        );
    }

    #[tokio::test]
    async fn apply_rerenders_current_inventory() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();

        h.orch.apply("team-a").await.unwrap();
        assert_eq!(
            h.cluster.applied("team-a").unwrap()[0].content,
            "replicas: 1"
        );
    }

    #[tokio::test]
    async fn delete_without_wait_removes_local_state_immediately() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();

        h.orch.delete("team-a", false).await.unwrap();
        assert!(!h.cluster.has_namespace("team-a"));
        assert!(!h.inventories.exists("team-a").await.unwrap());
        assert_eq!(h.configs.set("team-a"), None);
    }

    #[tokio::test]
    async fn delete_with_wait_leaves_local_state_for_the_reconciler() {
        let h = harness();
        h.orch.create("team-a").await.unwrap();

        h.orch.delete("team-a", true).await.unwrap();
        assert!(!h.cluster.has_namespace("team-a"));
        assert!(h.inventories.exists("team-a").await.unwrap());
    }

    #[tokio::test]
    async fn delete_resource_removes_one_job() {
        let h = harness();
        h.cluster.add_job("team-a", "migrate");
        h.cluster.add_job("team-a", "seed");

        h.orch.delete_resource("team-a", "migrate").await.unwrap();
        assert_eq!(h.cluster.jobs_in("team-a"), vec!["seed".to_string()]);
    }

    #[tokio::test]
    async fn list_namespaces_is_sorted_with_readiness_and_managed() {
        let h = harness();
        h.orch.create("zulu").await.unwrap();
        h.cluster.add_namespace("alpha", NamespacePhase::Active);
        h.cluster.set_pods(
            "zulu",
            vec![
                PodInfo {
                    name: "a".to_string(),
                    phase: PodPhase::Running,
                },
                PodInfo {
                    name: "b".to_string(),
                    phase: PodPhase::Pending,
                },
            ],
        );

        let statuses = h.orch.list_namespaces().await.unwrap();
        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zulu"]);

        assert_eq!(statuses[0].status, 0);
        assert!(!statuses[0].managed);
        assert_eq!(statuses[1].status, 50);
        assert!(statuses[1].managed);
    }

    /// Cluster view where a namespace appears in the listing but is
    /// garbage-collected before any follow-up read succeeds.
    struct VanishingNamespaces;

    #[async_trait::async_trait]
    impl crate::repos::NamespaceRepository for VanishingNamespaces {
        async fn create(&self, _name: &str) -> CoreResult<()> {
            Ok(())
        }

        async fn delete(&self, _name: &str) -> CoreResult<()> {
            Ok(())
        }

        async fn get(&self, name: &str) -> CoreResult<crate::types::NamespaceInfo> {
            if name == "stable" {
                Ok(crate::types::NamespaceInfo {
                    name: name.to_string(),
                    phase: NamespacePhase::Active,
                })
            } else {
                Err(CoreError::Cluster(format!("namespace {name} not found")))
            }
        }

        async fn list(&self) -> CoreResult<Vec<crate::types::NamespaceInfo>> {
            Ok(vec![
                crate::types::NamespaceInfo {
                    name: "stable".to_string(),
                    phase: NamespacePhase::Active,
                },
                crate::types::NamespaceInfo {
                    name: "vanishing".to_string(),
                    phase: NamespacePhase::Terminating,
                },
            ])
        }

        async fn watch_deleted(&self) -> CoreResult<tokio::sync::mpsc::Receiver<String>> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn list_namespaces_survives_a_namespace_vanishing_mid_listing() {
        let cluster = Arc::new(MemoryCluster::new());
        let orch = Orchestrator::new(Repositories {
            playbooks: Arc::new(playbook()),
            inventories: Arc::new(MemoryInventories::default()),
            configs: Arc::new(MemoryConfigs::default()),
            namespaces: Arc::new(VanishingNamespaces),
            pods: cluster.clone(),
            deployments: cluster.clone(),
            services: cluster.clone(),
            jobs: cluster.clone(),
            cluster,
        });

        // The listing works from its own snapshot; a `get` on the
        // vanishing namespace would fail, as `namespace_status` shows.
        let statuses = orch.list_namespaces().await.unwrap();
        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["stable", "vanishing"]);
        assert_eq!(statuses[1].phase, NamespacePhase::Terminating);

        let err = orch.namespace_status("vanishing").await.unwrap_err();
        assert!(matches!(err, CoreError::Cluster(_)));
    }

    #[tokio::test]
    async fn namespace_status_excludes_succeeded_pods() {
        let h = harness();
        h.cluster.add_namespace("team-a", NamespacePhase::Active);
        h.cluster.set_pods(
            "team-a",
            vec![
                PodInfo {
                    name: "worker".to_string(),
                    phase: PodPhase::Running,
                },
                PodInfo {
                    name: "migration".to_string(),
                    phase: PodPhase::Succeeded,
                },
            ],
        );

        let status = h.orch.namespace_status("team-a").await.unwrap();
        assert_eq!(status.status, 100);
    }

    #[tokio::test]
    async fn version_combines_tool_and_cluster() {
        let h = harness();
        let version = h.orch.version().await.unwrap();
        assert_eq!(version.warden, env!("CARGO_PKG_VERSION"));
        assert_eq!(version.server, "1.31");
    }
}
