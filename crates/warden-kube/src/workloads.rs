//! Workload reads (pods, deployments, services) and job deletion.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, DeleteParams, ListParams};
use kube::ResourceExt;
use warden_core::repos::{DeploymentRepository, JobRepository, PodRepository, ServiceRepository};
use warden_core::{CoreResult, DeploymentInfo, PodInfo, PodPhase, ServiceInfo};

use crate::{cluster_err, KubeClient};

fn deployment_ready(deployment: &Deployment) -> bool {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    ready >= desired
}

fn service_url(service: &Service, namespace: &str) -> String {
    let port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|port| port.port)
        .unwrap_or(80);
    format!(
        "http://{}.{namespace}.svc.cluster.local:{port}",
        service.name_any()
    )
}

#[async_trait]
impl PodRepository for KubeClient {
    /// Pods in the namespace, excluding completed (Succeeded) ones. The
    /// filter runs server-side via a field selector.
    async fn list(&self, namespace: &str) -> CoreResult<Vec<PodInfo>> {
        let api: Api<Pod> = Api::namespaced(self.client(), namespace);
        let params = ListParams::default().fields("status.phase!=Succeeded");
        let pods = api
            .list(&params)
            .await
            .map_err(|e| cluster_err("listing pods", e))?;
        Ok(pods
            .items
            .iter()
            .map(|pod| PodInfo {
                name: pod.name_any(),
                phase: pod
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    .map(PodPhase::parse)
                    .unwrap_or(PodPhase::Unknown),
            })
            .collect())
    }
}

#[async_trait]
impl DeploymentRepository for KubeClient {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<DeploymentInfo>> {
        let api: Api<Deployment> = Api::namespaced(self.client(), namespace);
        let deployments = api
            .list(&Default::default())
            .await
            .map_err(|e| cluster_err("listing deployments", e))?;
        Ok(deployments
            .items
            .iter()
            .map(|deployment| DeploymentInfo {
                name: deployment.name_any(),
                ready: deployment_ready(deployment),
            })
            .collect())
    }
}

#[async_trait]
impl ServiceRepository for KubeClient {
    async fn list(&self, namespace: &str) -> CoreResult<Vec<ServiceInfo>> {
        let api: Api<Service> = Api::namespaced(self.client(), namespace);
        let services = api
            .list(&Default::default())
            .await
            .map_err(|e| cluster_err("listing services", e))?;
        Ok(services
            .items
            .iter()
            .map(|service| ServiceInfo {
                name: service.name_any(),
                url: service_url(service, namespace),
            })
            .collect())
    }
}

#[async_trait]
impl JobRepository for KubeClient {
    /// Delete one job with background propagation, so its pods are
    /// garbage-collected rather than orphaned.
    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()> {
        let api: Api<Job> = Api::namespaced(self.client(), namespace);
        api.delete(name, &DeleteParams::background())
            .await
            .map_err(|e| cluster_err("deleting job", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};

    fn deployment(desired: Option<i32>, ready: Option<i32>) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: desired,
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: ready,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn deployment_ready_compares_ready_to_desired() {
        assert!(deployment_ready(&deployment(Some(3), Some(3))));
        assert!(!deployment_ready(&deployment(Some(3), Some(2))));
        assert!(!deployment_ready(&deployment(None, None))); // desired defaults to 1
        assert!(deployment_ready(&deployment(Some(0), None)));
    }

    #[test]
    fn service_url_uses_cluster_dns_and_first_port() {
        let mut service = Service::default();
        service.metadata.name = Some("web".to_string());
        service.spec = Some(ServiceSpec {
            ports: Some(vec![
                ServicePort {
                    port: 8080,
                    ..Default::default()
                },
                ServicePort {
                    port: 9090,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        });

        assert_eq!(
            service_url(&service, "team-a"),
            "http://web.team-a.svc.cluster.local:8080"
        );
    }
}
