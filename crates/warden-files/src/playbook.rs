//! File-backed playbook: `*.tpl` template sources plus `defaults.json`.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use warden_core::repos::PlaybookRepository;
use warden_core::{ConfigTemplate, CoreError, CoreResult, Inventory, Values};

use crate::storage_err;

pub const TEMPLATE_SUFFIX: &str = "tpl";

pub struct FilePlaybook {
    templates_dir: PathBuf,
    defaults_path: PathBuf,
}

impl FilePlaybook {
    pub fn new(templates_dir: PathBuf, defaults_path: PathBuf) -> Self {
        Self {
            templates_dir,
            defaults_path,
        }
    }
}

#[async_trait]
impl PlaybookRepository for FilePlaybook {
    /// Every `*.tpl` file in the templates directory, ordered by file name.
    async fn templates(&self) -> CoreResult<Vec<ConfigTemplate>> {
        let mut entries = tokio::fs::read_dir(&self.templates_dir)
            .await
            .map_err(|e| storage_err("reading templates directory", e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("reading templates directory", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(TEMPLATE_SUFFIX) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(CoreError::NoTemplatesFound);
        }
        paths.sort();

        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            let source = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CoreError::Template {
                    name: name.clone(),
                    message: format!("unreadable template file: {e}"),
                })?;
            templates.push(ConfigTemplate { name, source });
        }
        Ok(templates)
    }

    async fn defaults(&self) -> CoreResult<Inventory> {
        let raw = tokio::fs::read_to_string(&self.defaults_path)
            .await
            .map_err(|e| CoreError::DefaultsUnreadable(e.to_string()))?;
        let values: Values = serde_json::from_str(&raw)
            .map_err(|e| CoreError::DefaultsUnreadable(format!("invalid JSON: {e}")))?;
        Ok(Inventory {
            namespace: String::new(),
            values,
        })
    }

    /// Raw text of `<templates>/<name>.tpl`, for snippet composition.
    async fn snippet(&self, name: &str) -> CoreResult<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(CoreError::Template {
                name: name.to_string(),
                message: "invalid snippet name".to_string(),
            });
        }
        let path = self.templates_dir.join(format!("{name}.{TEMPLATE_SUFFIX}"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CoreError::Template {
                name: name.to_string(),
                message: "snippet not found".to_string(),
            }),
            Err(e) => Err(storage_err("reading snippet", e)),
        }
    }
}
