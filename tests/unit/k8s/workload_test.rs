use anyhow::anyhow;

use podpulse::cli::prepare_workload;
use podpulse::config::WorkloadConfig;
use podpulse::k8s::{DeploySummary, WorkloadDeployer, WorkloadSpec};

use crate::common::MockDeployer;

#[tokio::test]
async fn test_prepare_workload_returns_summary() {
    let mut deployer = MockDeployer::new();
    deployer
        .expect_deploy()
        .withf(|count, namespace| *count == 5 && namespace == "bench")
        .times(1)
        .returning(|count, _| Ok(DeploySummary { created: count - 1, failed: 1 }));

    let summary = prepare_workload(&deployer, 5, "bench").await;

    assert_eq!(summary, Some(DeploySummary { created: 4, failed: 1 }));
}

#[tokio::test]
async fn test_prepare_workload_swallows_errors() {
    // Purpose: a cluster problem must not abort telemetry collection
    let mut deployer = MockDeployer::new();
    deployer
        .expect_deploy()
        .times(1)
        .returning(|_, _| Err(anyhow!("connection refused")));

    assert_eq!(prepare_workload(&deployer, 3, "default").await, None);
}

#[tokio::test]
async fn test_delete_existing_mock_contract() {
    let mut deployer = MockDeployer::new();
    deployer
        .expect_delete_existing()
        .withf(|namespace| namespace == "bench")
        .times(1)
        .returning(|_| Ok(2));

    assert_eq!(deployer.delete_existing("bench").await.unwrap(), 2);
}

#[test]
fn test_spec_follows_workload_config() {
    let config = WorkloadConfig {
        name_prefix: "load-".to_string(),
        app_label: "stress".to_string(),
        image: "alpine".to_string(),
        cpu_options: vec!["250m".to_string()],
        memory_options: vec!["64Mi".to_string()],
        ..WorkloadConfig::default()
    };
    let spec = WorkloadSpec::from(&config);

    let pod = spec.build_pod(3);

    let name = pod.metadata.name.clone().unwrap();
    assert!(name.starts_with("load-3-"));
    assert!(spec.owns(&name));
    assert!(!spec.owns("kube-proxy-abcde"));

    let labels = pod.metadata.labels.unwrap();
    assert_eq!(labels.get("app").map(String::as_str), Some("stress"));

    let container = &pod.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("alpine"));
    let requests = container.resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["cpu"].0, "250m");
    assert_eq!(requests["memory"].0, "64Mi");
}

#[test]
fn test_pod_names_are_unique_per_call() {
    let spec = WorkloadSpec::default();

    let names: std::collections::HashSet<String> = (0..20).map(|_| spec.pod_name(1)).collect();

    assert!(names.len() > 1);
}

#[test]
fn test_pod_name_carries_prefix_index_and_suffix() {
    let spec = WorkloadSpec::default();

    let name = spec.pod_name(7);

    assert!(name.starts_with("auto-pod-7-"));
    let suffix = name.trim_start_matches("auto-pod-7-");
    assert_eq!(suffix.len(), 4);
    assert!(suffix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
}

#[test]
fn test_built_pod_uses_matching_requests_and_limits() {
    let spec = WorkloadSpec::default();

    let pod = spec.build_pod(1);

    assert_eq!(
        pod.metadata.labels.as_ref().and_then(|l| l.get("app")).map(String::as_str),
        Some("auto-demo")
    );
    let pod_spec = pod.spec.unwrap();
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("Never"));
    let container = &pod_spec.containers[0];
    assert_eq!(container.name, "main");
    assert_eq!(container.image.as_deref(), Some("busybox"));
    assert_eq!(
        container.command,
        Some(vec!["sh".to_string(), "-c".to_string(), "sleep 3600".to_string()])
    );

    let resources = container.resources.as_ref().unwrap();
    assert_eq!(resources.requests, resources.limits);
    let cpu = &resources.requests.as_ref().unwrap()["cpu"].0;
    assert!(spec.cpu_options.contains(cpu));
}

#[test]
fn test_empty_resource_options_fall_back() {
    let spec = WorkloadSpec {
        cpu_options: Vec::new(),
        memory_options: Vec::new(),
        ..WorkloadSpec::default()
    };

    let pod = spec.build_pod(1);

    let container = &pod.spec.unwrap().containers[0];
    let requests = container.resources.as_ref().unwrap().requests.clone().unwrap();
    assert_eq!(requests["cpu"].0, "100m");
    assert_eq!(requests["memory"].0, "128Mi");
}
