//! File-backed config sets: `configs/<namespace>/` with one file per
//! rendered template.
//!
//! `replace_set` stages the new set in a temp directory and swaps it in
//! with a rename, so readers see either the old set or the new one, never
//! a mix.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use warden_core::repos::ConfigRepository;
use warden_core::{Config, CoreResult};

use crate::{safe_name, storage_err};

pub struct FileConfigs {
    dir: PathBuf,
}

impl FileConfigs {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn set_dir(&self, namespace: &str) -> PathBuf {
        self.dir.join(namespace)
    }

    /// Read back the persisted set, ordered by config name. Absent
    /// namespace reads as an empty set.
    pub async fn read_set(&self, namespace: &str) -> CoreResult<Vec<Config>> {
        safe_name(namespace)?;
        let mut entries = match tokio::fs::read_dir(self.set_dir(namespace)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("reading config set", e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("reading config set", e))?
        {
            paths.push(entry.path());
        }
        paths.sort();

        let mut configs = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| storage_err("reading config", e))?;
            configs.push(Config { name, content });
        }
        Ok(configs)
    }
}

#[async_trait]
impl ConfigRepository for FileConfigs {
    async fn replace_set(&self, namespace: &str, configs: &[Config]) -> CoreResult<()> {
        safe_name(namespace)?;

        let staging = tempfile::tempdir_in(&self.dir)
            .map_err(|e| storage_err("creating config staging directory", e))?;
        for config in configs {
            tokio::fs::write(staging.path().join(&config.name), &config.content)
                .await
                .map_err(|e| storage_err("writing config", e))?;
        }

        // Move the previous set aside before the swap so an interruption
        // between the renames leaves the old render intact, then let the
        // graveyard handle remove it on drop.
        let target = self.set_dir(namespace);
        let graveyard = tempfile::tempdir_in(&self.dir)
            .map_err(|e| storage_err("creating config graveyard directory", e))?;
        match tokio::fs::rename(&target, graveyard.path().join("previous")).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(storage_err("setting aside previous config set", e)),
        }
        tokio::fs::rename(staging.path(), &target)
            .await
            .map_err(|e| storage_err("swapping in config set", e))?;
        // The staging handle now points at a path that no longer exists;
        // its cleanup on drop is a no-op.

        debug!(%namespace, configs = configs.len(), "config set replaced");
        Ok(())
    }

    async fn delete_set(&self, namespace: &str) -> CoreResult<()> {
        safe_name(namespace)?;
        match tokio::fs::remove_dir_all(self.set_dir(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("deleting config set", e)),
        }
    }
}
