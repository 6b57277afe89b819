//! Config rendering service — turns one inventory into a named set of
//! rendered configuration documents and persists that set as a unit.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::render;
use crate::repos::{ConfigRepository, PlaybookRepository};
use crate::types::{Config, Inventory, InventoryRelease};

#[derive(Clone)]
pub struct ConfigService {
    configs: Arc<dyn ConfigRepository>,
    playbooks: Arc<dyn PlaybookRepository>,
}

impl ConfigService {
    pub fn new(
        configs: Arc<dyn ConfigRepository>,
        playbooks: Arc<dyn PlaybookRepository>,
    ) -> Self {
        Self { configs, playbooks }
    }

    /// Render every playbook template against the inventory and persist the
    /// resulting config set for the namespace as a single replacement.
    ///
    /// One release is stamped per call and shared by all rendered configs.
    /// A rendering failure aborts before anything is persisted, so readers
    /// keep observing the previous set. The rendered set is also returned
    /// so callers can apply it without a read-back through storage.
    pub async fn generate(&self, inventory: &Inventory) -> CoreResult<Vec<Config>> {
        if inventory.namespace.is_empty() {
            return Err(CoreError::empty_namespace());
        }

        let templates = self.playbooks.templates().await?;
        let release = InventoryRelease::new(inventory);

        let mut configs = Vec::with_capacity(templates.len());
        for template in &templates {
            let mut snippets = HashMap::new();
            for name in render::snippet_refs(&template.source) {
                let text = self.playbooks.snippet(&name).await?;
                snippets.insert(name, text);
            }
            configs.push(render::render(template, &release, &snippets)?);
        }

        self.configs
            .replace_set(&inventory.namespace, &configs)
            .await?;

        info!(
            namespace = %inventory.namespace,
            configs = configs.len(),
            release = %release.release.date,
            "config set rendered"
        );
        Ok(configs)
    }

    /// Remove all persisted configs for the namespace. Idempotent if none
    /// exist.
    pub async fn delete(&self, namespace: &str) -> CoreResult<()> {
        self.configs.delete_set(namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConfigs, MemoryPlaybook};
    use crate::types::Values;

    fn inventory(namespace: &str, values: serde_json::Value) -> Inventory {
        let values: Values = serde_json::from_value(values).unwrap();
        Inventory {
            namespace: namespace.to_string(),
            values,
        }
    }

    #[tokio::test]
    async fn generate_renders_one_config_per_template() {
        let playbook = MemoryPlaybook::new()
            .with_template("deployment", "replicas: {{.Values.replicas}}")
            .with_template("service", "ns: {{.Namespace}}")
            .with_defaults(serde_json::json!({}));
        let store = Arc::new(MemoryConfigs::default());
        let configs = ConfigService::new(store.clone(), Arc::new(playbook));

        let rendered = configs
            .generate(&inventory("team-a", serde_json::json!({"replicas": 2})))
            .await
            .unwrap();

        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].name, "deployment");
        assert_eq!(rendered[0].content, "replicas: 2");
        assert_eq!(rendered[1].content, "ns: team-a");

        // Persisted set matches the returned set.
        assert_eq!(store.set("team-a"), Some(rendered));
    }

    #[tokio::test]
    async fn generate_empty_namespace_is_validation_error() {
        let playbook = MemoryPlaybook::new()
            .with_template("deployment", "x")
            .with_defaults(serde_json::json!({}));
        let configs = ConfigService::new(Arc::new(MemoryConfigs::default()), Arc::new(playbook));

        let err = configs
            .generate(&inventory("", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn generate_without_templates_fails_and_keeps_previous_set() {
        let empty_playbook = MemoryPlaybook::new().with_defaults(serde_json::json!({}));
        let store = Arc::new(MemoryConfigs::default());

        // Seed a previous render.
        let previous = vec![Config {
            name: "deployment".to_string(),
            content: "replicas: 1".to_string(),
        }];
        store.seed("team-a", previous.clone());

        let configs = ConfigService::new(store.clone(), Arc::new(empty_playbook));
        let err = configs
            .generate(&inventory("team-a", serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NoTemplatesFound));
        assert_eq!(store.set("team-a"), Some(previous));
    }

    #[tokio::test]
    async fn generate_render_failure_keeps_previous_set() {
        let playbook = MemoryPlaybook::new()
            .with_template("ok", "fine")
            .with_template("broken", "{{ .Values.x")
            .with_defaults(serde_json::json!({}));
        let store = Arc::new(MemoryConfigs::default());
        store.seed(
            "team-a",
            vec![Config {
                name: "ok".to_string(),
                content: "old".to_string(),
            }],
        );

        let configs = ConfigService::new(store.clone(), Arc::new(playbook));
        let err = configs
            .generate(&inventory("team-a", serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Template { .. }));
        assert_eq!(store.set("team-a").unwrap()[0].content, "old");
    }

    #[tokio::test]
    async fn generate_resolves_snippets_through_the_playbook() {
        let playbook = MemoryPlaybook::new()
            .with_template("cm", "labels:\n{{ getFile \"labels\" }}")
            .with_snippet("labels", "  app: {{.Namespace}}")
            .with_defaults(serde_json::json!({}));
        let store = Arc::new(MemoryConfigs::default());
        let configs = ConfigService::new(store.clone(), Arc::new(playbook));

        let rendered = configs
            .generate(&inventory("team-a", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(rendered[0].content, "labels:\n  app: team-a");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let playbook = MemoryPlaybook::new()
            .with_template("cm", "x")
            .with_defaults(serde_json::json!({}));
        let store = Arc::new(MemoryConfigs::default());
        let configs = ConfigService::new(store.clone(), Arc::new(playbook));

        configs.delete("ghost").await.unwrap();
        configs.delete("ghost").await.unwrap();
    }
}
