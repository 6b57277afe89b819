//! warden-core — domain logic for playbook-driven namespace provisioning.
//!
//! A playbook (templates plus a default parameter set) is rendered against
//! a per-namespace [`Inventory`] to produce a [`Config`] set applied to a
//! cluster namespace. This crate holds the domain types, the error
//! taxonomy, the repository traits backends implement, the rendering
//! engine, the inventory/config services, the [`Orchestrator`] that
//! composes them, and the deletion reconciliation loop.
//!
//! # Architecture
//!
//! Storage and cluster access live behind the traits in [`repos`];
//! `warden-files` and `warden-kube` provide the real implementations and
//! [`memory`] provides in-memory ones for tests and embedding. Services
//! and the orchestrator are `Clone` (backed by `Arc<dyn Trait>`) and can
//! be shared across async tasks.

pub mod config;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod orchestrator;
pub mod render;
pub mod repos;
pub mod types;
pub mod watcher;

pub use config::ConfigService;
pub use error::{CoreError, CoreResult};
pub use inventory::InventoryService;
pub use orchestrator::{Orchestrator, Repositories};
pub use types::*;
pub use watcher::DeletionReconciler;
