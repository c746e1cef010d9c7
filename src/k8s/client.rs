use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use tracing::{debug, info};

/// Kubernetes client for the workload deployer.
///
/// An explicit kubeconfig file wins; a bare context name is resolved against
/// the default kubeconfig; otherwise the in-cluster / environment config is used.
pub async fn create_client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..KubeConfigOptions::default()
    };
    if let Some(ctx) = context {
        info!("Using context: {}", ctx);
    }

    let config = match kubeconfig {
        Some(path) => {
            info!("Loading kubeconfig from: {}", path.display());
            let file = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(file, &options).await?
        }
        None if context.is_some() => Config::from_kubeconfig(&options).await?,
        None => {
            debug!("Inferring Kubernetes config from environment");
            Config::infer().await?
        }
    };

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Namespace of the current context in `~/.kube/config`, if it sets one
pub fn get_current_context_namespace() -> Option<String> {
    let home_dir = directories::BaseDirs::new()?.home_dir().to_path_buf();
    let kubeconfig = Kubeconfig::read_from(home_dir.join(".kube/config")).ok()?;
    let current_context_name = kubeconfig.current_context.as_ref()?;

    kubeconfig
        .contexts
        .iter()
        .find(|ctx| &ctx.name == current_context_name)
        .and_then(|named| named.context.as_ref())
        .and_then(|context| context.namespace.clone())
}
