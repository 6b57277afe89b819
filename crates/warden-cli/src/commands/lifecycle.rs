//! Namespace lifecycle commands: create, delete, reset, apply.

use crate::settings::Settings;
use crate::wiring;

pub async fn create(settings: &Settings, namespace: &str) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    let inventory = orch.create(namespace).await?;
    println!(
        "namespace {} provisioned ({} values)",
        inventory.namespace,
        inventory.values.len()
    );
    Ok(())
}

pub async fn delete_namespace(
    settings: &Settings,
    namespace: &str,
    wait: bool,
) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    orch.delete(namespace, wait).await?;
    if wait {
        println!("namespace {namespace} deletion issued, local cleanup deferred");
    } else {
        println!("namespace {namespace} deleted");
    }
    Ok(())
}

pub async fn delete_job(settings: &Settings, namespace: &str, job: &str) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    orch.delete_resource(namespace, job).await?;
    println!("job {job} deleted from {namespace}");
    Ok(())
}

pub async fn reset(settings: &Settings, namespace: &str) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    orch.reset(namespace).await?;
    println!("namespace {namespace} reset to playbook defaults");
    Ok(())
}

pub async fn apply(settings: &Settings, namespace: &str) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    orch.apply(namespace).await?;
    println!("configs applied to {namespace}");
    Ok(())
}
