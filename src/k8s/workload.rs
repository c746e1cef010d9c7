use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams, ResourceExt};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::config::WorkloadConfig;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Outcome of a deployment batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploySummary {
    pub created: usize,
    pub failed: usize,
}

/// Places synthetic load on the cluster before telemetry collection starts
#[async_trait]
pub trait WorkloadDeployer: Send + Sync {
    /// Remove previous synthetic pods, then create `count` new ones
    async fn deploy(&self, count: usize, namespace: &str) -> Result<DeploySummary>;

    /// Delete synthetic pods left over from an earlier run, returning how many went
    async fn delete_existing(&self, namespace: &str) -> Result<usize>;
}

/// Shape of the synthetic pods
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub name_prefix: String,
    pub app_label: String,
    pub image: String,
    pub command: Vec<String>,
    pub cpu_options: Vec<String>,
    pub memory_options: Vec<String>,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self::from(&WorkloadConfig::default())
    }
}

impl From<&WorkloadConfig> for WorkloadSpec {
    fn from(config: &WorkloadConfig) -> Self {
        Self {
            name_prefix: config.name_prefix.clone(),
            app_label: config.app_label.clone(),
            image: config.image.clone(),
            command: config.command.clone(),
            cpu_options: config.cpu_options.clone(),
            memory_options: config.memory_options.clone(),
        }
    }
}

impl WorkloadSpec {
    /// `<prefix><index>-<4 random chars>`
    pub fn pod_name(&self, index: usize) -> String {
        format!("{}{}-{}", self.name_prefix, index, random_suffix(4))
    }

    pub fn owns(&self, pod_name: &str) -> bool {
        pod_name.starts_with(&self.name_prefix)
    }

    /// Build pod `index` with a random CPU/memory size; requests equal limits
    pub fn build_pod(&self, index: usize) -> Pod {
        let cpu = pick(&self.cpu_options, "100m");
        let memory = pick(&self.memory_options, "128Mi");

        let resources: BTreeMap<String, Quantity> = [
            ("cpu".to_string(), Quantity(cpu)),
            ("memory".to_string(), Quantity(memory)),
        ]
        .into_iter()
        .collect();

        Pod {
            metadata: ObjectMeta {
                name: Some(self.pod_name(index)),
                labels: Some(BTreeMap::from([("app".to_string(), self.app_label.clone())])),
                ..ObjectMeta::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "main".to_string(),
                    image: Some(self.image.clone()),
                    command: Some(self.command.clone()),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources.clone()),
                        limits: Some(resources),
                        ..ResourceRequirements::default()
                    }),
                    ..Container::default()
                }],
                restart_policy: Some("Never".to_string()),
                ..PodSpec::default()
            }),
            ..Pod::default()
        }
    }
}

/// Random lowercase alphanumeric string
pub fn random_suffix(len: usize) -> String {
    (0..len)
        .map(|_| SUFFIX_CHARSET[fastrand::usize(..SUFFIX_CHARSET.len())] as char)
        .collect()
}

fn pick(options: &[String], fallback: &str) -> String {
    fastrand::choice(options)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// Deploys synthetic pods through the Kubernetes API
pub struct KubeWorkloadDeployer {
    client: Client,
    spec: WorkloadSpec,
}

impl KubeWorkloadDeployer {
    pub fn new(client: Client, spec: WorkloadSpec) -> Self {
        Self { client, spec }
    }
}

#[async_trait]
impl WorkloadDeployer for KubeWorkloadDeployer {
    async fn deploy(&self, count: usize, namespace: &str) -> Result<DeploySummary> {
        if let Err(e) = self.delete_existing(namespace).await {
            error!("❌ Error deleting pods: {:#}", e);
        }

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut summary = DeploySummary::default();

        for index in 1..=count {
            let pod = self.spec.build_pod(index);
            let name = pod.name_any();

            match pods.create(&PostParams::default(), &pod).await {
                Ok(_) => {
                    summary.created += 1;
                    debug!("Created pod {}/{}", namespace, name);
                    println!("✅ Created pod {} ({})", name, describe_resources(&pod));
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("❌ Failed to create pod {}: {}", name, e);
                }
            }
        }

        info!(
            "Deployed {} of {} pods in namespace {}",
            summary.created, count, namespace
        );
        Ok(summary)
    }

    async fn delete_existing(&self, namespace: &str) -> Result<usize> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_list = pods
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in namespace {}", namespace))?;

        let mut deleted = 0;
        for pod in pod_list {
            let name = pod.name_any();
            if !self.spec.owns(&name) {
                continue;
            }

            println!("🗑️ Deleting existing pod: {}", name);
            match pods.delete(&name, &DeleteParams::default()).await {
                Ok(_) => deleted += 1,
                Err(e) => error!("❌ Error deleting pod {}: {}", name, e),
            }
        }

        Ok(deleted)
    }
}

fn describe_resources(pod: &Pod) -> String {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.containers.first())
        .and_then(|container| container.resources.as_ref())
        .and_then(|resources| resources.requests.as_ref())
        .map(|requests| {
            let get = |key: &str| requests.get(key).map(|q| q.0.as_str()).unwrap_or("-");
            format!("CPU={}, Memory={}", get("cpu"), get("memory"))
        })
        .unwrap_or_default()
}
