use chrono::Utc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use super::kind::MetricKind;
use super::round::SamplingRound;
use super::sample::Snapshot;
use super::NodeAddress;
use crate::output::sink::SnapshotSink;

/// Where the loop currently is within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Sampling,
    Writing,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `total_duration` elapsed
    Deadline,
    /// The cancellation token fired
    Cancelled,
    /// A round had more failed pairs than `max_failed_pairs`
    FailureThreshold,
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub ticks: usize,
    pub snapshots_written: usize,
    pub write_failures: usize,
    pub incomplete_rounds: usize,
    pub stop_reason: StopReason,
}

/// Runs a sampling round every `interval` and appends each snapshot to a sink
pub struct PollingLoop {
    round: SamplingRound,
    max_failed_pairs: Option<usize>,
    state: PollState,
}

impl PollingLoop {
    pub fn new(round: SamplingRound) -> Self {
        Self {
            round,
            max_failed_pairs: None,
            state: PollState::Running,
        }
    }

    /// Stop after a round with more than `limit` failed pairs
    pub fn with_max_failed_pairs(mut self, limit: Option<usize>) -> Self {
        self.max_failed_pairs = limit;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn transition(&mut self, next: PollState) {
        trace!("Polling state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Poll until `total_duration` has elapsed or `cancel` fires.
    ///
    /// Cancellation is observed before each tick and while waiting between
    /// ticks. A tick that has started sampling always finishes its append.
    pub async fn run<S: SnapshotSink + ?Sized>(
        &mut self,
        addresses: &[NodeAddress],
        kinds: &[MetricKind],
        interval: Duration,
        total_duration: Duration,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> PollReport {
        let deadline = Instant::now() + total_duration;
        let mut ticks = 0;
        let mut snapshots_written = 0;
        let mut write_failures = 0;
        let mut incomplete_rounds = 0;

        self.transition(PollState::Running);
        info!(
            "Polling {} addresses x {} metrics every {:?} for {:?}",
            addresses.len(),
            kinds.len(),
            interval,
            total_duration
        );

        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if Instant::now() >= deadline {
                break StopReason::Deadline;
            }

            self.transition(PollState::Sampling);
            let sampled_at = Utc::now();
            let round = self.round.run(addresses, kinds).await;
            ticks += 1;

            let failed = round.failed_count();
            if failed > 0 {
                incomplete_rounds += 1;
            }

            self.transition(PollState::Writing);
            let snapshot = Snapshot::new(sampled_at, round);
            match sink.append(&snapshot) {
                Ok(()) => {
                    snapshots_written += 1;
                    info!("📁 Logged telemetry at {}", snapshot.timestamp().format("%Y-%m-%d %H:%M:%S"));
                }
                Err(e) => {
                    // The snapshot is dropped; the next tick writes a fresh one
                    write_failures += 1;
                    error!("Failed to append snapshot: {}", e);
                }
            }
            self.transition(PollState::Running);

            if let Some(limit) = self.max_failed_pairs {
                if failed > limit {
                    warn!("Round had {} failed pairs (limit {}), stopping", failed, limit);
                    break StopReason::FailureThreshold;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let cancelled = tokio::select! {
                _ = cancel.cancelled() => true,
                _ = sleep(interval.min(remaining)) => false,
            };
            if cancelled {
                break StopReason::Cancelled;
            }
        };

        self.transition(PollState::Stopped);
        info!("🛑 Stopping telemetry collection ({:?} after {} ticks)", stop_reason, ticks);

        PollReport {
            ticks,
            snapshots_written,
            write_failures,
            incomplete_rounds,
            stop_reason,
        }
    }
}
