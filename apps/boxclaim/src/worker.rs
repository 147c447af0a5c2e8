use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bitset::BitSet;
use crate::metrics;
use crate::pause;
use crate::range::IndexRange;
use crate::snapshot::StateSource;
use crate::toggler::BatchToggler;
use crate::transport::{Connection, Connector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Fetching,
    Connecting,
    Toggling,
    BackoffWait,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Fetching => "fetching",
            WorkerState::Connecting => "connecting",
            WorkerState::Toggling => "toggling",
            WorkerState::BackoffWait => "backoff",
        };
        f.write_str(label)
    }
}

/// State plus whatever the next step needs to carry over.
enum Step {
    Fetching,
    Connecting(BitSet),
    Toggling(BitSet, Box<dyn Connection>),
    BackoffWait,
}

impl Step {
    fn state(&self) -> WorkerState {
        match self {
            Step::Fetching => WorkerState::Fetching,
            Step::Connecting(_) => WorkerState::Connecting,
            Step::Toggling(..) => WorkerState::Toggling,
            Step::BackoffWait => WorkerState::BackoffWait,
        }
    }
}

/// Owns one index range for its whole life and keeps cycling over it.
pub struct Worker {
    id: usize,
    range: IndexRange,
    source: Arc<dyn StateSource>,
    connector: Arc<dyn Connector>,
    toggler: BatchToggler,
    reconnect_wait: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        range: IndexRange,
        source: Arc<dyn StateSource>,
        connector: Arc<dyn Connector>,
        toggler: BatchToggler,
        reconnect_wait: Duration,
    ) -> Self {
        Self {
            id,
            range,
            source,
            connector,
            toggler,
            reconnect_wait,
        }
    }

    /// Runs fetch → connect → toggle cycles until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            worker = self.id,
            start = self.range.start,
            end = self.range.end,
            "worker started"
        );
        let mut step = Step::Fetching;

        while !cancel.is_cancelled() {
            let from = step.state();
            step = match step {
                Step::Fetching => {
                    let fetched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        fetched = self.source.fetch() => fetched,
                    };
                    match fetched {
                        Ok(bitset) => Step::Connecting(bitset),
                        Err(err) => {
                            metrics::FETCH_FAILURES.inc();
                            error!(worker = self.id, error = %err, "failed to fetch initial state");
                            Step::BackoffWait
                        }
                    }
                }
                Step::Connecting(bitset) => {
                    let connected = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        connected = self.connector.connect() => connected,
                    };
                    match connected {
                        Ok(conn) => Step::Toggling(bitset, conn),
                        Err(err) => {
                            metrics::CONNECT_FAILURES.inc();
                            error!(worker = self.id, error = %err, "failed to connect stream");
                            Step::BackoffWait
                        }
                    }
                }
                Step::Toggling(bitset, mut conn) => {
                    let report = self
                        .toggler
                        .run(&bitset, self.range, conn.as_mut(), &cancel)
                        .await;
                    conn.close().await;
                    if report.cancelled {
                        break;
                    }
                    if report.truncated {
                        warn!(
                            worker = self.id,
                            start = self.range.start,
                            end = self.range.end,
                            snapshot_len = bitset.len(),
                            claimed = report.claimed,
                            "range exceeds snapshot; backing off before resync"
                        );
                        Step::BackoffWait
                    } else {
                        metrics::CYCLES.inc();
                        info!(
                            worker = self.id,
                            windows = report.windows,
                            claimed = report.claimed,
                            sent = report.batches_sent,
                            abandoned = report.batches_abandoned,
                            "cycle complete; resyncing"
                        );
                        Step::Fetching
                    }
                }
                Step::BackoffWait => {
                    warn!(
                        worker = self.id,
                        wait_ms = self.reconnect_wait.as_millis() as u64,
                        "backing off before next cycle"
                    );
                    if !pause(self.reconnect_wait, &cancel).await {
                        break;
                    }
                    Step::Fetching
                }
            };
            debug!(worker = self.id, from = %from, to = %step.state(), "worker transition");
        }

        info!(worker = self.id, "worker stopped");
    }
}
