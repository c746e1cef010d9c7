// Node telemetry sampling
pub mod client;
pub mod kind;
pub mod poller;
pub mod query;
pub mod round;
pub mod sample;

/// Node identifier as understood by the metrics backend, usually an IP
pub type NodeAddress = String;

// Re-export key types for convenience
pub use client::{MetricsClient, PrometheusClient};
pub use kind::MetricKind;
pub use poller::{PollReport, PollState, PollingLoop, StopReason};
pub use query::{PromQlTemplates, QueryBuilder};
pub use round::SamplingRound;
pub use sample::{ErrorKind, MetricSample, QueryError, SamplingRoundResult, Snapshot};
