//! In-memory repository implementations.
//!
//! These back the test suites of every crate in the workspace and double
//! as a zero-dependency backend for embedding. `MemoryCluster` implements
//! all cluster-facing traits on one struct, mirroring how a single cluster
//! client backs them in production.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{CoreError, CoreResult};
use crate::repos::{
    ClusterRepository, ConfigRepository, DeploymentRepository, InventoryRepository, JobRepository,
    NamespaceRepository, PlaybookRepository, PodRepository, ServiceRepository,
};
use crate::types::{
    ClusterVersion, Config, ConfigTemplate, DeploymentInfo, Inventory, NamespaceInfo,
    NamespacePhase, PodInfo, PodPhase, ServiceInfo, Values,
};

// ── Playbook ───────────────────────────────────────────────────────

/// Immutable in-memory playbook, assembled with a builder.
#[derive(Default)]
pub struct MemoryPlaybook {
    templates: Vec<ConfigTemplate>,
    defaults: Option<Values>,
    snippets: HashMap<String, String>,
}

impl MemoryPlaybook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: &str, source: &str) -> Self {
        self.templates.push(ConfigTemplate {
            name: name.to_string(),
            source: source.to_string(),
        });
        self
    }

    pub fn with_defaults(mut self, values: serde_json::Value) -> Self {
        let values: Values = serde_json::from_value(values).unwrap_or_default();
        self.defaults = Some(values);
        self
    }

    pub fn with_snippet(mut self, name: &str, text: &str) -> Self {
        self.snippets.insert(name.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl PlaybookRepository for MemoryPlaybook {
    async fn templates(&self) -> CoreResult<Vec<ConfigTemplate>> {
        if self.templates.is_empty() {
            return Err(CoreError::NoTemplatesFound);
        }
        Ok(self.templates.clone())
    }

    async fn defaults(&self) -> CoreResult<Inventory> {
        let values = self
            .defaults
            .clone()
            .ok_or_else(|| CoreError::DefaultsUnreadable("no defaults configured".to_string()))?;
        Ok(Inventory {
            namespace: String::new(),
            values,
        })
    }

    async fn snippet(&self, name: &str) -> CoreResult<String> {
        self.snippets
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::Template {
                name: name.to_string(),
                message: "snippet not found".to_string(),
            })
    }
}

// ── Inventories ────────────────────────────────────────────────────

/// In-memory inventory records, ordered by namespace.
#[derive(Default)]
pub struct MemoryInventories {
    records: Mutex<BTreeMap<String, Inventory>>,
}

#[async_trait]
impl InventoryRepository for MemoryInventories {
    async fn get(&self, namespace: &str) -> CoreResult<Inventory> {
        let records = self.records.lock().expect("inventory lock");
        records
            .get(namespace)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("inventory for namespace `{namespace}`")))
    }

    async fn exists(&self, namespace: &str) -> CoreResult<bool> {
        let records = self.records.lock().expect("inventory lock");
        Ok(records.contains_key(namespace))
    }

    async fn create(&self, inventory: &Inventory) -> CoreResult<()> {
        let mut records = self.records.lock().expect("inventory lock");
        if records.contains_key(&inventory.namespace) {
            return Err(CoreError::AlreadyExists(format!(
                "inventory for namespace `{}`",
                inventory.namespace
            )));
        }
        records.insert(inventory.namespace.clone(), inventory.clone());
        Ok(())
    }

    async fn update(&self, namespace: &str, inventory: &Inventory) -> CoreResult<()> {
        let mut records = self.records.lock().expect("inventory lock");
        if !records.contains_key(namespace) {
            return Err(CoreError::NotFound(format!(
                "inventory for namespace `{namespace}`"
            )));
        }
        records.insert(namespace.to_string(), inventory.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str) -> CoreResult<()> {
        let mut records = self.records.lock().expect("inventory lock");
        records
            .remove(namespace)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("inventory for namespace `{namespace}`")))
    }

    async fn list(&self) -> CoreResult<Vec<Inventory>> {
        let records = self.records.lock().expect("inventory lock");
        Ok(records.values().cloned().collect())
    }
}

// ── Configs ────────────────────────────────────────────────────────

/// In-memory rendered config sets, keyed by namespace.
#[derive(Default)]
pub struct MemoryConfigs {
    sets: Mutex<HashMap<String, Vec<Config>>>,
}

impl MemoryConfigs {
    /// Current set for a namespace, if any.
    pub fn set(&self, namespace: &str) -> Option<Vec<Config>> {
        self.sets.lock().expect("config lock").get(namespace).cloned()
    }

    /// Seed a pre-existing set (test setup).
    pub fn seed(&self, namespace: &str, configs: Vec<Config>) {
        self.sets
            .lock()
            .expect("config lock")
            .insert(namespace.to_string(), configs);
    }
}

#[async_trait]
impl ConfigRepository for MemoryConfigs {
    async fn replace_set(&self, namespace: &str, configs: &[Config]) -> CoreResult<()> {
        self.sets
            .lock()
            .expect("config lock")
            .insert(namespace.to_string(), configs.to_vec());
        Ok(())
    }

    async fn delete_set(&self, namespace: &str) -> CoreResult<()> {
        self.sets.lock().expect("config lock").remove(namespace);
        Ok(())
    }
}

// ── Cluster ────────────────────────────────────────────────────────

/// In-memory stand-in for the cluster API. One struct implements every
/// cluster-facing trait, with test hooks to stage namespaces, pods,
/// deployments, services, and jobs, and to emit deletion notifications.
#[derive(Default)]
pub struct MemoryCluster {
    namespaces: Mutex<BTreeMap<String, NamespacePhase>>,
    pods: Mutex<HashMap<String, Vec<PodInfo>>>,
    deployments: Mutex<HashMap<String, Vec<DeploymentInfo>>>,
    services: Mutex<HashMap<String, Vec<ServiceInfo>>>,
    jobs: Mutex<HashMap<String, Vec<String>>>,
    applied: Mutex<HashMap<String, Vec<Config>>>,
    watchers: Mutex<Vec<mpsc::Sender<String>>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_namespace(&self, name: &str, phase: NamespacePhase) {
        self.namespaces
            .lock()
            .expect("namespace lock")
            .insert(name.to_string(), phase);
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces
            .lock()
            .expect("namespace lock")
            .contains_key(name)
    }

    pub fn set_pods(&self, namespace: &str, pods: Vec<PodInfo>) {
        self.pods
            .lock()
            .expect("pod lock")
            .insert(namespace.to_string(), pods);
    }

    pub fn set_deployments(&self, namespace: &str, deployments: Vec<DeploymentInfo>) {
        self.deployments
            .lock()
            .expect("deployment lock")
            .insert(namespace.to_string(), deployments);
    }

    pub fn set_services(&self, namespace: &str, services: Vec<ServiceInfo>) {
        self.services
            .lock()
            .expect("service lock")
            .insert(namespace.to_string(), services);
    }

    pub fn add_job(&self, namespace: &str, name: &str) {
        self.jobs
            .lock()
            .expect("job lock")
            .entry(namespace.to_string())
            .or_default()
            .push(name.to_string());
    }

    pub fn jobs_in(&self, namespace: &str) -> Vec<String> {
        self.jobs
            .lock()
            .expect("job lock")
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Last applied config set for a namespace.
    pub fn applied(&self, namespace: &str) -> Option<Vec<Config>> {
        self.applied
            .lock()
            .expect("apply lock")
            .get(namespace)
            .cloned()
    }

    /// Emit a deletion notification to every subscribed watcher.
    pub async fn notify_deleted(&self, namespace: &str) {
        let watchers = {
            let guard = self.watchers.lock().expect("watcher lock");
            guard.clone()
        };
        for tx in watchers {
            let _ = tx.send(namespace.to_string()).await;
        }
    }
}

#[async_trait]
impl NamespaceRepository for MemoryCluster {
    async fn create(&self, name: &str) -> CoreResult<()> {
        // Idempotent, like the real cluster repo treating 409 as success.
        self.namespaces
            .lock()
            .expect("namespace lock")
            .entry(name.to_string())
            .or_insert(NamespacePhase::Active);
        Ok(())
    }

    async fn delete(&self, name: &str) -> CoreResult<()> {
        let mut namespaces = self.namespaces.lock().expect("namespace lock");
        namespaces
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::Cluster(format!("namespace `{name}` not found")))
    }

    async fn get(&self, name: &str) -> CoreResult<NamespaceInfo> {
        let namespaces = self.namespaces.lock().expect("namespace lock");
        namespaces
            .get(name)
            .map(|phase| NamespaceInfo {
                name: name.to_string(),
                phase: *phase,
            })
            .ok_or_else(|| CoreError::Cluster(format!("namespace `{name}` not found")))
    }

    async fn list(&self) -> CoreResult<Vec<NamespaceInfo>> {
        let namespaces = self.namespaces.lock().expect("namespace lock");
        Ok(namespaces
            .iter()
            .map(|(name, phase)| NamespaceInfo {
                name: name.clone(),
                phase: *phase,
            })
            .collect())
    }

    async fn watch_deleted(&self) -> CoreResult<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(16);
        self.watchers.lock().expect("watcher lock").push(tx);
        Ok(rx)
    }
}

#[async_trait]
impl PodRepository for MemoryCluster {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<PodInfo>> {
        let pods = self.pods.lock().expect("pod lock");
        Ok(pods
            .get(namespace)
            .map(|list| {
                list.iter()
                    .filter(|pod| pod.phase != PodPhase::Succeeded)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl DeploymentRepository for MemoryCluster {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<DeploymentInfo>> {
        let deployments = self.deployments.lock().expect("deployment lock");
        Ok(deployments.get(namespace).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ServiceRepository for MemoryCluster {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<ServiceInfo>> {
        let services = self.services.lock().expect("service lock");
        Ok(services.get(namespace).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl JobRepository for MemoryCluster {
    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()> {
        let mut jobs = self.jobs.lock().expect("job lock");
        let in_namespace = jobs.entry(namespace.to_string()).or_default();
        let before = in_namespace.len();
        in_namespace.retain(|job| job != name);
        if in_namespace.len() == before {
            return Err(CoreError::Cluster(format!(
                "job `{name}` not found in namespace `{namespace}`"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterRepository for MemoryCluster {
    async fn apply(&self, namespace: &str, configs: &[Config]) -> CoreResult<()> {
        self.applied
            .lock()
            .expect("apply lock")
            .insert(namespace.to_string(), configs.to_vec());
        Ok(())
    }

    async fn version(&self) -> CoreResult<ClusterVersion> {
        Ok(ClusterVersion {
            client: "1.31".to_string(),
            server: "1.31".to_string(),
        })
    }
}
