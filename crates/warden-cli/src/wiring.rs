//! Backend assembly: file storage plus the cluster client, wired into an
//! orchestrator.

use std::sync::Arc;

use warden_core::{Orchestrator, Repositories};
use warden_files::Client as FileClient;
use warden_kube::KubeClient;

use crate::settings::Settings;

pub async fn orchestrator(settings: &Settings) -> anyhow::Result<Orchestrator> {
    let files = FileClient::open(&settings.root).await?;
    let kube = Arc::new(KubeClient::connect(settings.context.as_deref()).await?);

    Ok(Orchestrator::new(Repositories {
        playbooks: Arc::new(files.playbook()),
        inventories: Arc::new(files.inventories()),
        configs: Arc::new(files.configs()),
        namespaces: kube.clone(),
        pods: kube.clone(),
        deployments: kube.clone(),
        services: kube.clone(),
        jobs: kube.clone(),
        cluster: kube,
    }))
}
