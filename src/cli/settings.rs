use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;

use super::args::Args;
use crate::config::Config;
use crate::metrics::{MetricKind, NodeAddress};

/// Everything a collection run needs, after merging flags over config
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub addresses: Vec<NodeAddress>,
    pub kinds: Vec<MetricKind>,
    pub interval: Duration,
    pub total_duration: Duration,
    pub namespace: String,
    pub num_pods: usize,
    pub deploy: bool,
    pub prometheus_url: String,
    pub output_file: PathBuf,
    pub query_timeout: Option<Duration>,
    pub max_concurrency: usize,
    pub max_failed_pairs: Option<usize>,
}

impl RunSettings {
    /// Flags win over the config file, which wins over built-in defaults
    pub fn resolve(args: &Args, config: &Config) -> Result<Self> {
        if args.ips.is_empty() {
            return Err(anyhow!("At least one node address is required (--ips <IP>...)"));
        }

        let duration = args
            .duration
            .ok_or_else(|| anyhow!("A collection duration is required (--duration <SECONDS>)"))?;

        let interval = args.interval.unwrap_or(config.telemetry.interval_secs);
        if interval == 0 {
            return Err(anyhow!("Interval must be at least 1 second"));
        }

        let mut kinds = args
            .metrics
            .clone()
            .unwrap_or_else(|| config.telemetry.metrics.clone());
        if kinds.is_empty() {
            kinds = MetricKind::default_set();
        }

        let prometheus_url = args
            .prometheus_url
            .clone()
            .unwrap_or_else(|| config.telemetry.prometheus_url.clone());
        if !prometheus_url.starts_with("http://") && !prometheus_url.starts_with("https://") {
            return Err(anyhow!("Invalid Prometheus URL: '{}'. Must be a valid HTTP/HTTPS URL", prometheus_url));
        }

        let namespace = args
            .namespace
            .clone()
            .or_else(|| config.workload.namespace.clone())
            .or_else(crate::k8s::client::get_current_context_namespace)
            .unwrap_or_else(|| "default".to_string());

        let timeout_secs = args.query_timeout.unwrap_or(config.telemetry.query_timeout_secs);

        Ok(Self {
            addresses: args.ips.clone(),
            kinds,
            interval: Duration::from_secs(interval),
            total_duration: Duration::from_secs(duration),
            namespace,
            num_pods: args.num_pods.unwrap_or(config.workload.num_pods),
            deploy: !args.skip_deploy,
            prometheus_url,
            output_file: args
                .output_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.telemetry.output_file)),
            query_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_concurrency: args.max_concurrency.unwrap_or(config.telemetry.max_concurrency),
            max_failed_pairs: args.max_failed_pairs,
        })
    }
}
