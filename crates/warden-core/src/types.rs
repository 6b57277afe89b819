//! Domain types for playbooks, inventories, and namespace health.
//!
//! An `Inventory` holds the per-namespace parameters a playbook's templates
//! are rendered against. Rendering stamps a `Release` and produces one
//! `Config` per template. Namespace health is summarized in
//! `NamespaceStatus`, computed on read and never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameter mapping stored in an inventory (key → arbitrary JSON value).
pub type Values = serde_json::Map<String, serde_json::Value>;

// ── Inventory ──────────────────────────────────────────────────────

/// Per-namespace parameter set used to render a playbook's templates.
///
/// The default parameter set loaded from a playbook is an `Inventory`
/// with the namespace left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub values: Values,
}

impl Inventory {
    /// Build an inventory for `namespace` seeded from a default parameter set.
    pub fn from_defaults(namespace: &str, defaults: &Inventory) -> Self {
        Self {
            namespace: namespace.to_string(),
            values: defaults.values.clone(),
        }
    }
}

/// Coarse provenance stamp attached to every render.
///
/// Minute-level granularity is a deliberate trade-off: enough to diagnose
/// stale configuration, not a unique version id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub date: String,
}

impl Release {
    /// Stamp a release with the current UTC time at minute granularity.
    pub fn stamp() -> Self {
        Self {
            date: chrono::Utc::now().format("%Y%m%d%H%M").to_string(),
        }
    }
}

/// Transient rendering context: an inventory enriched with release data.
/// Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRelease {
    pub namespace: String,
    pub values: Values,
    pub release: Release,
}

impl InventoryRelease {
    /// Combine an inventory with a freshly stamped release.
    pub fn new(inventory: &Inventory) -> Self {
        Self {
            namespace: inventory.namespace.clone(),
            values: inventory.values.clone(),
            release: Release::stamp(),
        }
    }
}

// ── Rendering ──────────────────────────────────────────────────────

/// A parameterized template loaded from the playbook's template directory.
/// The name is the source file name minus its template suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTemplate {
    pub name: String,
    pub source: String,
}

/// One rendered configuration document. A namespace owns an ordered set of
/// these, replaced wholly on each render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub content: String,
}

// ── Cluster read models ────────────────────────────────────────────

/// Cluster-reported namespace lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespacePhase {
    Active,
    Terminating,
    Unknown,
}

impl fmt::Display for NamespacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespacePhase::Active => write!(f, "Active"),
            NamespacePhase::Terminating => write!(f, "Terminating"),
            NamespacePhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Cluster-reported pod lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Parse the phase string reported by the cluster API.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// A namespace as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub phase: NamespacePhase,
}

/// A pod observed in a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub phase: PodPhase,
}

/// A deployment observed in a namespace. `ready` is true when all desired
/// replicas report ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub name: String,
    pub ready: bool,
}

/// A service observed in a namespace, with its cluster-derived URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub url: String,
}

// ── Aggregated status ──────────────────────────────────────────────

/// Aggregate health of a namespace, computed on read.
///
/// `status` is the percentage of observed pods in a running state and
/// `managed` is true iff a local inventory exists for the namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStatus {
    pub name: String,
    pub phase: NamespacePhase,
    pub status: u8,
    pub managed: bool,
}

/// Version triple reported by the `version` surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub warden: String,
    pub client: String,
    pub server: String,
}

/// Cluster API client/server versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterVersion {
    pub client: String,
    pub server: String,
}

/// Readiness percentage: round(100 × ready ⁄ total), 0 when no pods are
/// observed. Always in [0, 100].
pub fn ready_percent(ready: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((ready as f64 * 100.0) / total as f64).round() as u8
}
