mod args;
mod settings;

pub use args::{parse_args, Args, Commands};
pub use settings::RunSettings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::k8s::{create_client, DeploySummary, KubeWorkloadDeployer, WorkloadDeployer, WorkloadSpec};
use crate::metrics::{MetricsClient, PollReport, PollingLoop, PrometheusClient, SamplingRound};
use crate::output::sink::{FileSink, SnapshotSink};

pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    match &args.command {
        Some(Commands::SetConfig { key, value }) => {
            let mut config = Config::load()?;
            config.set_value(key, value)?;
            config.save()?;
            return Ok(());
        }
        Some(Commands::GetConfig { key }) => {
            let config = Config::load()?;
            match key {
                Some(key) => print!("{}", config.display_key(key)?),
                None => print!("{}", config.display()),
            }
            return Ok(());
        }
        Some(Commands::Summarize { file, ips, metrics }) => {
            return crate::output::summary::print_summary(file, ips, metrics.as_deref());
        }
        None => {}
    }

    let config = Config::load()?;
    let settings = RunSettings::resolve(&args, &config)?;

    let deployer = if settings.deploy {
        build_deployer(&args, &config).await
    } else {
        None
    };

    execute(
        &settings,
        &config,
        deployer.as_ref().map(|d| d as &dyn WorkloadDeployer),
        &cancel,
    )
    .await?;
    Ok(())
}

/// Open the results file and metrics client, deploy, then collect.
///
/// Every fallible startup step runs before `deployer` touches the cluster.
pub async fn execute(
    settings: &RunSettings,
    config: &Config,
    deployer: Option<&dyn WorkloadDeployer>,
    cancel: &CancellationToken,
) -> Result<PollReport> {
    let mut sink = FileSink::open(&settings.output_file)
        .with_context(|| format!("Cannot open results file {}", settings.output_file.display()))?;

    let client = PrometheusClient::new(
        settings.prometheus_url.clone(),
        Arc::new(config.telemetry.query_templates()),
    )?;

    if let Some(deployer) = deployer {
        println!("🚀 Deploying pods...");
        prepare_workload(deployer, settings.num_pods, &settings.namespace).await;
    }

    println!("📡 Starting telemetry collection from nodes: {:?}", settings.addresses);
    let report = collect_telemetry(Arc::new(client), settings, &mut sink, cancel).await;

    println!(
        "🛑 Stopping telemetry collection: {} snapshots written to {} ({} rounds incomplete, {} write failures)",
        report.snapshots_written,
        settings.output_file.display(),
        report.incomplete_rounds,
        report.write_failures
    );
    Ok(report)
}

/// Kubernetes deployer, or None when no client can be built; collection runs either way
async fn build_deployer(args: &Args, config: &Config) -> Option<KubeWorkloadDeployer> {
    match create_client(args.kubeconfig.as_deref(), args.context.as_deref()).await {
        Ok(client) => Some(KubeWorkloadDeployer::new(client, WorkloadSpec::from(&config.workload))),
        Err(e) => {
            error!("Failed to create Kubernetes client: {:#}", e);
            eprintln!("❌ Skipping pod deployment, no Kubernetes client: {:#}", e);
            None
        }
    }
}

/// Deploy synthetic pods, logging instead of propagating failures
pub async fn prepare_workload(
    deployer: &dyn WorkloadDeployer,
    count: usize,
    namespace: &str,
) -> Option<DeploySummary> {
    match deployer.deploy(count, namespace).await {
        Ok(summary) => {
            info!("Workload ready: {} created, {} failed", summary.created, summary.failed);
            Some(summary)
        }
        Err(e) => {
            error!("Workload deployment failed: {:#}", e);
            eprintln!("❌ Workload deployment failed: {:#}", e);
            None
        }
    }
}

/// Wire a round and polling loop from `settings` and run it to completion
pub async fn collect_telemetry<S: SnapshotSink + ?Sized>(
    client: Arc<dyn MetricsClient>,
    settings: &RunSettings,
    sink: &mut S,
    cancel: &CancellationToken,
) -> PollReport {
    let mut round = SamplingRound::new(client).with_max_concurrency(settings.max_concurrency);
    if let Some(limit) = settings.query_timeout {
        round = round.with_query_timeout(limit);
    }

    let mut poller = PollingLoop::new(round).with_max_failed_pairs(settings.max_failed_pairs);
    poller
        .run(
            &settings.addresses,
            &settings.kinds,
            settings.interval,
            settings.total_duration,
            sink,
            cancel,
        )
        .await
}
