//! Capability traits for the storage and cluster collaborators.
//!
//! Each repository is a narrow interface with one real implementation
//! (`warden-files`, `warden-kube`) and one in-memory implementation
//! ([`crate::memory`]) used by tests and embedders. The services and the
//! orchestrator depend only on these traits, never on a backend directly.
//!
//! The storage side must provide per-namespace atomic create/update/delete
//! so concurrent operations cannot silently drop a write, and
//! [`ConfigRepository::replace_set`] must replace the whole set in one
//! operation so readers never observe a mix of two renders.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreResult;
use crate::types::{
    ClusterVersion, Config, ConfigTemplate, DeploymentInfo, Inventory, NamespaceInfo, PodInfo,
    ServiceInfo,
};

// ── Storage collaborators ──────────────────────────────────────────

/// Loads a playbook's templates and default parameter set.
#[async_trait]
pub trait PlaybookRepository: Send + Sync {
    /// Load every template from the playbook, in a stable order.
    ///
    /// Fails with `NoTemplatesFound` when the template directory contains
    /// zero matching files, and with a `Template` error naming the
    /// offending file when one cannot be read.
    async fn templates(&self) -> CoreResult<Vec<ConfigTemplate>>;

    /// Load the default parameter set. Fails with `DefaultsUnreadable` if
    /// the defaults file is missing or not valid structured data.
    async fn defaults(&self) -> CoreResult<Inventory>;

    /// Raw text of another template file by logical name, for snippet
    /// composition via the `getFile` template function. A missing snippet
    /// is a recoverable `Template` error.
    async fn snippet(&self, name: &str) -> CoreResult<String>;
}

/// Persistence for per-namespace inventories.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn get(&self, namespace: &str) -> CoreResult<Inventory>;
    async fn exists(&self, namespace: &str) -> CoreResult<bool>;
    /// Fails with `AlreadyExists` when a record for the namespace is present.
    async fn create(&self, inventory: &Inventory) -> CoreResult<()>;
    /// Full replace of the stored record. Fails with `NotFound` when absent.
    async fn update(&self, namespace: &str, inventory: &Inventory) -> CoreResult<()>;
    async fn delete(&self, namespace: &str) -> CoreResult<()>;
    /// All inventories, ordered by namespace.
    async fn list(&self) -> CoreResult<Vec<Inventory>>;
}

/// Persistence for rendered config sets, keyed by namespace.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Replace the namespace's entire config set in one operation.
    async fn replace_set(&self, namespace: &str, configs: &[Config]) -> CoreResult<()>;
    /// Remove the namespace's config set. Idempotent if none exists.
    async fn delete_set(&self, namespace: &str) -> CoreResult<()>;
}

// ── Cluster collaborators ──────────────────────────────────────────

/// Namespace resources in the cluster.
#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    /// Create the namespace. Idempotent: an already-existing namespace is
    /// not an error.
    async fn create(&self, name: &str) -> CoreResult<()>;
    /// Issue a namespace deletion. The cluster garbage-collects the
    /// namespace's resources asynchronously.
    async fn delete(&self, name: &str) -> CoreResult<()>;
    async fn get(&self, name: &str) -> CoreResult<NamespaceInfo>;
    async fn list(&self) -> CoreResult<Vec<NamespaceInfo>>;
    /// Subscribe to namespace deletion notifications. The same namespace
    /// may be reported more than once.
    async fn watch_deleted(&self) -> CoreResult<mpsc::Receiver<String>>;
}

/// Pods in a namespace. Implementations exclude pods in the terminal
/// `Succeeded` phase.
#[async_trait]
pub trait PodRepository: Send + Sync {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<PodInfo>>;
}

/// Deployments in a namespace.
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<DeploymentInfo>>;
}

/// Services in a namespace.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<ServiceInfo>>;
}

/// Batch jobs in a namespace.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()>;
}

/// Cluster-wide operations: applying rendered configs and reporting
/// API versions.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    /// Apply a rendered config set to the given namespace.
    async fn apply(&self, namespace: &str, configs: &[Config]) -> CoreResult<()>;
    async fn version(&self) -> CoreResult<ClusterVersion>;
}
