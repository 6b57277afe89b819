//! Deletion reconciliation loop.
//!
//! Cluster-side namespace deletion is asynchronous: a namespace can
//! disappear long after (or without) a local `delete`. The reconciler
//! consumes deletion notifications and drops the matching local inventory
//! and config set, so bookkeeping converges on what the cluster reports.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::error::CoreResult;
use crate::repos::{ConfigRepository, InventoryRepository};

#[derive(Clone)]
pub struct DeletionReconciler {
    inventories: Arc<dyn InventoryRepository>,
    configs: Arc<dyn ConfigRepository>,
}

impl DeletionReconciler {
    pub fn new(
        inventories: Arc<dyn InventoryRepository>,
        configs: Arc<dyn ConfigRepository>,
    ) -> Self {
        Self {
            inventories,
            configs,
        }
    }

    /// Drive the loop until the event channel closes or shutdown flips to
    /// true. A failed reconcile is logged and the loop keeps running; the
    /// same namespace may be notified again.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("deletion reconciler started");
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(namespace) = event else {
                        info!("deletion event channel closed, reconciler stopping");
                        break;
                    };
                    if let Err(err) = self.reconcile(&namespace).await {
                        error!(%namespace, %err, "failed to reconcile deleted namespace");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown signalled, reconciler stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Drop local state for a namespace the cluster reports deleted.
    /// Idempotent: a namespace with no local inventory is a no-op, so
    /// duplicate notifications are harmless.
    pub async fn reconcile(&self, namespace: &str) -> CoreResult<()> {
        if !self.inventories.exists(namespace).await? {
            debug!(%namespace, "deleted namespace was not managed, nothing to do");
            return Ok(());
        }

        self.inventories.delete(namespace).await?;
        self.configs.delete_set(namespace).await?;
        info!(%namespace, "local state removed for deleted namespace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConfigs, MemoryInventories};
    use crate::repos::InventoryRepository as _;
    use crate::types::{Config, Inventory};

    fn seeded() -> (DeletionReconciler, Arc<MemoryInventories>, Arc<MemoryConfigs>) {
        let inventories = Arc::new(MemoryInventories::default());
        let configs = Arc::new(MemoryConfigs::default());
        (
            DeletionReconciler::new(inventories.clone(), configs.clone()),
            inventories,
            configs,
        )
    }

    #[tokio::test]
    async fn reconcile_removes_inventory_and_configs() {
        let (reconciler, inventories, configs) = seeded();
        inventories
            .create(&Inventory {
                namespace: "team-a".to_string(),
                values: Default::default(),
            })
            .await
            .unwrap();
        configs.seed(
            "team-a",
            vec![Config {
                name: "deployment".to_string(),
                content: "x".to_string(),
            }],
        );

        reconciler.reconcile("team-a").await.unwrap();
        assert!(!inventories.exists("team-a").await.unwrap());
        assert_eq!(configs.set("team-a"), None);
    }

    #[tokio::test]
    async fn reconcile_unmanaged_namespace_is_a_noop() {
        let (reconciler, _, _) = seeded();
        reconciler.reconcile("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_notifications_are_harmless() {
        let (reconciler, inventories, _) = seeded();
        inventories
            .create(&Inventory {
                namespace: "team-a".to_string(),
                values: Default::default(),
            })
            .await
            .unwrap();

        reconciler.reconcile("team-a").await.unwrap();
        reconciler.reconcile("team-a").await.unwrap();
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (reconciler, _, _) = seeded();
        let (_event_tx, event_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(reconciler.run(event_rx, shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_consumes_events_until_channel_close() {
        let (reconciler, inventories, _) = seeded();
        inventories
            .create(&Inventory {
                namespace: "team-a".to_string(),
                values: Default::default(),
            })
            .await
            .unwrap();

        let (event_tx, event_rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(reconciler.run(event_rx, shutdown_rx));

        event_tx.send("team-a".to_string()).await.unwrap();
        event_tx.send("team-a".to_string()).await.unwrap();
        drop(event_tx);
        handle.await.unwrap();

        assert!(!inventories.exists("team-a").await.unwrap());
    }
}
