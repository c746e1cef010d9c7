use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::client::MetricsClient;
use super::kind::MetricKind;
use super::sample::{MetricSample, QueryError, SamplingRoundResult};
use super::NodeAddress;

/// One synchronized pass over every (address, kind) pair
pub struct SamplingRound {
    client: Arc<dyn MetricsClient>,
    query_timeout: Option<Duration>,
    limiter: Option<Arc<Semaphore>>,
}

impl SamplingRound {
    pub fn new(client: Arc<dyn MetricsClient>) -> Self {
        Self {
            client,
            query_timeout: None,
            limiter: None,
        }
    }

    /// Map queries that take longer than `limit` to a timeout failure
    pub fn with_query_timeout(mut self, limit: Duration) -> Self {
        self.query_timeout = Some(limit);
        self
    }

    /// Cap the number of queries in flight; 0 means unbounded
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.limiter = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Query every pair concurrently and wait for all of them to settle.
    ///
    /// The returned vector always has `addresses.len() * kinds.len()` entries,
    /// ordered address-major (see [`super::sample::pair_index`]).
    pub async fn run(&self, addresses: &[NodeAddress], kinds: &[MetricKind]) -> SamplingRoundResult {
        let kind_count = kinds.len();
        let mut slots = Vec::with_capacity(addresses.len() * kind_count);

        for address in addresses {
            for kind in kinds {
                let client = Arc::clone(&self.client);
                let limiter = self.limiter.clone();
                let query_timeout = self.query_timeout;
                let address = address.clone();
                let kind = *kind;

                // Each spawned task owns the slot at its position in `slots`
                slots.push(tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };

                    match query_timeout {
                        Some(limit) => timeout(limit, client.fetch(kind, &address))
                            .await
                            .unwrap_or(Err(QueryError::Timeout(limit))),
                        None => client.fetch(kind, &address).await,
                    }
                }));
            }
        }

        let settled = join_all(slots).await;

        let samples: Vec<MetricSample> = settled
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                let address = &addresses[index / kind_count];
                let kind = kinds[index % kind_count];

                let outcome = outcome.unwrap_or_else(|join_error| Err(QueryError::Internal(join_error.to_string())));

                if let Err(e) = &outcome {
                    warn!(
                        address = %address,
                        kind = %kind,
                        error = %e.kind(),
                        detail = %e,
                        "Metric query failed"
                    );
                }

                MetricSample::from(outcome)
            })
            .collect();

        let result = SamplingRoundResult::new(samples);

        if result.is_complete() {
            debug!("Round complete: {} pairs sampled", result.len());
        } else {
            warn!(
                failed = result.failed_count(),
                total = result.len(),
                "⚠️ Some telemetry metrics were not collected successfully"
            );
        }

        result
    }
}
