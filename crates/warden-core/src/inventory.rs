//! Inventory service — CRUD and reset semantics for per-namespace
//! parameter sets.
//!
//! The service owns the validation rule (a namespace must be non-empty on
//! every operation) and the seeding/reset semantics against the playbook's
//! default parameter set. Persistence is delegated to an injected
//! [`InventoryRepository`].

use std::sync::Arc;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::repos::{InventoryRepository, PlaybookRepository};
use crate::types::Inventory;

#[derive(Clone)]
pub struct InventoryService {
    inventories: Arc<dyn InventoryRepository>,
    playbooks: Arc<dyn PlaybookRepository>,
}

impl InventoryService {
    pub fn new(
        inventories: Arc<dyn InventoryRepository>,
        playbooks: Arc<dyn PlaybookRepository>,
    ) -> Self {
        Self {
            inventories,
            playbooks,
        }
    }

    /// Create a new inventory for `namespace`, seeded from the playbook's
    /// current default parameter set.
    ///
    /// Fails with `AlreadyExists` when an inventory for the namespace is
    /// already present; callers decide whether that is fatal.
    pub async fn create(&self, namespace: &str) -> CoreResult<Inventory> {
        require_namespace(namespace)?;

        let defaults = self.playbooks.defaults().await?;
        let inventory = Inventory::from_defaults(namespace, &defaults);
        self.inventories.create(&inventory).await?;

        debug!(%namespace, "inventory created from defaults");
        Ok(inventory)
    }

    pub async fn get(&self, namespace: &str) -> CoreResult<Inventory> {
        require_namespace(namespace)?;
        self.inventories.get(namespace).await
    }

    pub async fn exists(&self, namespace: &str) -> CoreResult<bool> {
        require_namespace(namespace)?;
        self.inventories.exists(namespace).await
    }

    /// Replace the stored inventory for `namespace` wholesale. The
    /// namespace from the path wins over whatever the body carries, so a
    /// mismatched payload cannot relabel a record.
    pub async fn update(&self, namespace: &str, inventory: Inventory) -> CoreResult<()> {
        require_namespace(namespace)?;

        let inventory = Inventory {
            namespace: namespace.to_string(),
            values: inventory.values,
        };
        self.inventories.update(namespace, &inventory).await
    }

    /// Overwrite the namespace's values with the current default parameter
    /// set. Destructive: prior customization is discarded, not merged.
    pub async fn reset(&self, namespace: &str) -> CoreResult<Inventory> {
        require_namespace(namespace)?;

        let defaults = self.playbooks.defaults().await?;
        let inventory = Inventory::from_defaults(namespace, &defaults);
        self.inventories.update(namespace, &inventory).await?;

        debug!(%namespace, "inventory reset to defaults");
        Ok(inventory)
    }

    pub async fn delete(&self, namespace: &str) -> CoreResult<()> {
        require_namespace(namespace)?;
        self.inventories.delete(namespace).await
    }

    /// All inventories, ordered by namespace.
    pub async fn list(&self) -> CoreResult<Vec<Inventory>> {
        self.inventories.list().await
    }
}

fn require_namespace(namespace: &str) -> CoreResult<()> {
    if namespace.is_empty() {
        return Err(CoreError::empty_namespace());
    }
    Ok(())
}
