//! File-backed inventory records: one `<namespace>.json` per namespace.
//!
//! Writes go through a temp file in the same directory followed by a
//! rename, so a crash mid-write never leaves a truncated record behind.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use warden_core::repos::InventoryRepository;
use warden_core::{CoreError, CoreResult, Inventory};

use crate::{safe_name, storage_err};

pub struct FileInventories {
    dir: PathBuf,
}

impl FileInventories {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    fn write_record(&self, namespace: &str, inventory: &Inventory) -> CoreResult<()> {
        let body = serde_json::to_vec_pretty(inventory)
            .map_err(|e| CoreError::Storage(format!("encoding inventory: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| storage_err("creating inventory temp file", e))?;
        tmp.write_all(&body)
            .map_err(|e| storage_err("writing inventory", e))?;
        tmp.persist(self.path_for(namespace))
            .map_err(|e| storage_err("persisting inventory", e.error))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for FileInventories {
    async fn get(&self, namespace: &str) -> CoreResult<Inventory> {
        safe_name(namespace)?;
        match tokio::fs::read_to_string(self.path_for(namespace)).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| CoreError::Storage(format!("corrupt inventory record: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CoreError::NotFound(format!(
                "inventory for namespace `{namespace}`"
            ))),
            Err(e) => Err(storage_err("reading inventory", e)),
        }
    }

    async fn exists(&self, namespace: &str) -> CoreResult<bool> {
        safe_name(namespace)?;
        Ok(self.path_for(namespace).is_file())
    }

    async fn create(&self, inventory: &Inventory) -> CoreResult<()> {
        safe_name(&inventory.namespace)?;
        if self.path_for(&inventory.namespace).is_file() {
            return Err(CoreError::AlreadyExists(format!(
                "inventory for namespace `{}`",
                inventory.namespace
            )));
        }
        self.write_record(&inventory.namespace, inventory)
    }

    async fn update(&self, namespace: &str, inventory: &Inventory) -> CoreResult<()> {
        safe_name(namespace)?;
        if !self.path_for(namespace).is_file() {
            return Err(CoreError::NotFound(format!(
                "inventory for namespace `{namespace}`"
            )));
        }
        self.write_record(namespace, inventory)
    }

    async fn delete(&self, namespace: &str) -> CoreResult<()> {
        safe_name(namespace)?;
        match tokio::fs::remove_file(self.path_for(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CoreError::NotFound(format!(
                "inventory for namespace `{namespace}`"
            ))),
            Err(e) => Err(storage_err("deleting inventory", e)),
        }
    }

    async fn list(&self) -> CoreResult<Vec<Inventory>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| storage_err("reading inventories directory", e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("reading inventories directory", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut inventories = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| storage_err("reading inventory", e))?;
            let inventory: Inventory = serde_json::from_str(&raw)
                .map_err(|e| CoreError::Storage(format!("corrupt inventory record: {e}")))?;
            inventories.push(inventory);
        }
        Ok(inventories)
    }
}
