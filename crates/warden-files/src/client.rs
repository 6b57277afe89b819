//! Working-directory client: validation and repository construction.

use std::path::{Path, PathBuf};

use tracing::debug;
use warden_core::{CoreError, CoreResult};

use crate::{storage_err, FileConfigs, FileInventories, FilePlaybook};

pub const TEMPLATES_DIR: &str = "templates";
pub const DEFAULTS_FILE: &str = "defaults.json";
pub const INVENTORIES_DIR: &str = "inventories";
pub const CONFIGS_DIR: &str = "configs";

/// Handle on a validated playbook working directory.
#[derive(Debug, Clone)]
pub struct Client {
    root: PathBuf,
}

impl Client {
    /// Open a working directory. The playbook entries (`templates/`,
    /// `defaults.json`) must already exist; the derived directories
    /// (`inventories/`, `configs/`) are created when missing.
    pub async fn open(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();

        let templates = root.join(TEMPLATES_DIR);
        if !templates.is_dir() {
            return Err(CoreError::Validation(format!(
                "not a playbook directory: missing `{TEMPLATES_DIR}/` in {}",
                root.display()
            )));
        }
        if !root.join(DEFAULTS_FILE).is_file() {
            return Err(CoreError::Validation(format!(
                "not a playbook directory: missing `{DEFAULTS_FILE}` in {}",
                root.display()
            )));
        }

        for dir in [INVENTORIES_DIR, CONFIGS_DIR] {
            tokio::fs::create_dir_all(root.join(dir))
                .await
                .map_err(|e| storage_err(&format!("creating `{dir}/`"), e))?;
        }

        debug!(root = %root.display(), "playbook working directory opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn playbook(&self) -> FilePlaybook {
        FilePlaybook::new(
            self.root.join(TEMPLATES_DIR),
            self.root.join(DEFAULTS_FILE),
        )
    }

    pub fn inventories(&self) -> FileInventories {
        FileInventories::new(self.root.join(INVENTORIES_DIR))
    }

    pub fn configs(&self) -> FileConfigs {
        FileConfigs::new(self.root.join(CONFIGS_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_requires_templates_and_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let err = Client::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        std::fs::create_dir(dir.path().join(TEMPLATES_DIR)).unwrap();
        let err = Client::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        std::fs::write(dir.path().join(DEFAULTS_FILE), "{}").unwrap();
        Client::open(dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_derived_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(TEMPLATES_DIR)).unwrap();
        std::fs::write(dir.path().join(DEFAULTS_FILE), "{}").unwrap();

        Client::open(dir.path()).await.unwrap();
        assert!(dir.path().join(INVENTORIES_DIR).is_dir());
        assert!(dir.path().join(CONFIGS_DIR).is_dir());
    }
}
