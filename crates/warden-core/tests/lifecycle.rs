//! End-to-end namespace lifecycle against in-memory backends:
//! create → customize → reset → delete, with the deletion reconciler
//! cleaning up after cluster-side deletion.

use std::sync::Arc;

use tokio::sync::watch;

use warden_core::memory::{MemoryCluster, MemoryConfigs, MemoryInventories, MemoryPlaybook};
use warden_core::repos::{InventoryRepository as _, NamespaceRepository as _};
use warden_core::{Inventory, Orchestrator, Repositories};

struct World {
    orch: Orchestrator,
    cluster: Arc<MemoryCluster>,
    inventories: Arc<MemoryInventories>,
    configs: Arc<MemoryConfigs>,
}

fn world() -> World {
    let playbook = MemoryPlaybook::new()
        .with_template(
            "deployment",
            "namespace: {{.Namespace}}\nreplicas: {{.Values.replicas}}",
        )
        .with_template("service", "name: {{.Namespace}}-svc")
        .with_defaults(serde_json::json!({"replicas": 1}));

    let cluster = Arc::new(MemoryCluster::new());
    let inventories = Arc::new(MemoryInventories::default());
    let configs = Arc::new(MemoryConfigs::default());

    let orch = Orchestrator::new(Repositories {
        playbooks: Arc::new(playbook),
        inventories: inventories.clone(),
        configs: configs.clone(),
        namespaces: cluster.clone(),
        pods: cluster.clone(),
        deployments: cluster.clone(),
        services: cluster.clone(),
        jobs: cluster.clone(),
        cluster: cluster.clone(),
    });

    World {
        orch,
        cluster,
        inventories,
        configs,
    }
}

#[tokio::test]
async fn full_namespace_lifecycle() {
    let w = world();

    // Provision: cluster namespace, default inventory, rendered + applied
    // config set.
    let inv = w.orch.create("team-a").await.unwrap();
    assert_eq!(inv.values["replicas"], serde_json::json!(1));
    assert!(w.cluster.has_namespace("team-a"));

    let applied = w.cluster.applied("team-a").unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].content, "namespace: team-a\nreplicas: 1");
    assert_eq!(applied[1].content, "name: team-a-svc");

    // Customize.
    let body = Inventory {
        namespace: "team-a".to_string(),
        values: serde_json::from_value(serde_json::json!({"replicas": 3})).unwrap(),
    };
    w.orch.update("team-a", body).await.unwrap();
    assert_eq!(
        w.cluster.applied("team-a").unwrap()[0].content,
        "namespace: team-a\nreplicas: 3"
    );

    // Reset back to defaults.
    let reset = w.orch.reset("team-a").await.unwrap();
    assert_eq!(reset.values["replicas"], serde_json::json!(1));
    assert_eq!(
        w.cluster.applied("team-a").unwrap()[0].content,
        "namespace: team-a\nreplicas: 1"
    );

    // Immediate teardown removes local bookkeeping in the same call.
    w.orch.delete("team-a", false).await.unwrap();
    assert!(!w.cluster.has_namespace("team-a"));
    assert!(!w.inventories.exists("team-a").await.unwrap());
    assert_eq!(w.configs.set("team-a"), None);
}

#[tokio::test]
async fn reconciler_cleans_up_after_cluster_side_deletion() {
    let w = world();
    w.orch.create("team-a").await.unwrap();

    let events = w.cluster.watch_deleted().await.unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(w.orch.reconciler().run(events, shutdown_rx));

    // Deferred delete; the cluster reports the deletion, twice.
    w.orch.delete("team-a", true).await.unwrap();
    assert!(w.inventories.exists("team-a").await.unwrap());

    w.cluster.notify_deleted("team-a").await;
    w.cluster.notify_deleted("team-a").await;

    // An unmanaged namespace deletion is a no-op, not an error.
    w.cluster.notify_deleted("bystander").await;

    // Wait for the loop to drain the notifications before shutting down.
    let mut converged = false;
    for _ in 0..100 {
        if !w.inventories.exists("team-a").await.unwrap() {
            converged = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(converged, "reconciler never removed the inventory");

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(w.configs.set("team-a"), None);
}
