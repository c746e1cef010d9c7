pub mod client;
pub mod workload;

pub use client::create_client;
pub use workload::{DeploySummary, KubeWorkloadDeployer, WorkloadDeployer, WorkloadSpec};
