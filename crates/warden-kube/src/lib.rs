//! warden-kube — Kubernetes implementations of the cluster repositories.
//!
//! One [`KubeClient`] wraps a `kube::Client` and implements every
//! cluster-facing trait from `warden_core::repos`: namespaces, pods,
//! deployments, services, jobs, and the apply/version operations.
//! Rendered configs are parsed as (multi-document) YAML manifests and
//! applied server-side through the discovery API, so the playbook can
//! emit any resource kind the cluster knows about.

pub mod apply;
pub mod client;
pub mod namespaces;
pub mod workloads;

pub use client::KubeClient;

use warden_core::CoreError;

pub(crate) fn cluster_err(context: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Cluster(format!("{context}: {err}"))
}
