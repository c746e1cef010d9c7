use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::metrics::MetricKind;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Deploy synthetic pods and record per-node CPU, memory and disk telemetry from Prometheus",
    long_about = "podpulse deploys a batch of synthetic busybox pods with random resource requests, then samples\n\
node_exporter metrics for every node address from Prometheus at a fixed interval and appends one\n\
timestamped line per round to a results file.\n\
---\n\
Examples:\n\
  podpulse --ips 10.0.0.1 10.0.0.2 --duration 3600                  # deploy 100 pods, sample cpu+memory for 1h\n\
  podpulse --ips 10.0.0.1 -d 600 --metrics cpu,memory,disk -i 30    # three metrics every 30s\n\
  podpulse --ips 10.0.0.1 -d 600 --skip-deploy -w run1.txt          # telemetry only\n\
  podpulse summarize run1.txt --ips 10.0.0.1                        # per-pair statistics\n\
---\n\
Configuration Examples:\n\
  podpulse setconfig telemetry.prometheus_url http://prom:9090/api/v1/query\n\
  podpulse setconfig telemetry.metrics cpu,memory,disk\n\
  podpulse setconfig workload.num_pods 50\n\
  podpulse getconfig                                              # Show all current configuration\n\
  podpulse getconfig telemetry                                    # Show only telemetry settings"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Node IP addresses to sample (node_exporter instances)
    #[arg(long = "ips", value_name = "IP", num_args = 1..)]
    pub ips: Vec<String>,

    /// Total telemetry collection time in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub duration: Option<u64>,

    /// Seconds to wait between sampling rounds (default from config: 60)
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Metrics to sample, comma separated (cpu, memory, disk)
    #[arg(short, long, value_delimiter = ',', value_name = "KIND")]
    pub metrics: Option<Vec<MetricKind>>,

    /// Namespace the synthetic pods are deployed into
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Number of synthetic pods to deploy
    #[arg(long = "num-pods", alias = "num_pods", value_name = "COUNT")]
    pub num_pods: Option<usize>,

    /// Skip pod deployment and only collect telemetry
    #[arg(long)]
    pub skip_deploy: bool,

    /// Prometheus instant query endpoint
    #[arg(long, value_name = "URL")]
    pub prometheus_url: Option<String>,

    /// File snapshots are appended to
    #[arg(short = 'w', long = "output-file", value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Per-query timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECONDS")]
    pub query_timeout: Option<u64>,

    /// Maximum queries in flight per round, 0 for one task per pair
    #[arg(long, value_name = "COUNT")]
    pub max_concurrency: Option<usize>,

    /// Stop collecting after a round with more failed pairs than this
    #[arg(long, value_name = "COUNT")]
    pub max_failed_pairs: Option<usize>,

    /// Path to kubeconfig file
    #[arg(short, long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubernetes context to use
    #[arg(short = 'x', long)]
    pub context: Option<String>,

    /// Verbosity level for debug output
    #[arg(short, long, default_value = "0")]
    pub verbosity: u8,

    /// Enable development mode - internal logs are also written to a file
    #[arg(long)]
    pub dev: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Configure podpulse settings
    #[command(name = "setconfig")]
    SetConfig {
        /// Configuration key to set (dot notation, e.g. telemetry.interval_secs)
        key: String,
        /// Configuration value to set
        value: String,
    },
    /// Display current podpulse configuration
    #[command(name = "getconfig")]
    GetConfig {
        /// Optional specific key or section to display (e.g. telemetry)
        key: Option<String>,
    },
    /// Print per-pair statistics for a results file
    #[command(name = "summarize")]
    Summarize {
        /// Results file written by a previous run
        file: PathBuf,
        /// Node addresses of that run, used to label columns
        #[arg(long = "ips", value_name = "IP", num_args = 1..)]
        ips: Vec<String>,
        /// Metrics of that run, comma separated
        #[arg(short, long, value_delimiter = ',', value_name = "KIND")]
        metrics: Option<Vec<MetricKind>>,
    },
}

pub fn parse_args() -> Args {
    Args::parse()
}
