use std::time::Duration;

use boxclaim_proto::toggle_bits_frame;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bitset::BitSet;
use crate::config::ClaimConfig;
use crate::metrics;
use crate::pause;
use crate::range::IndexRange;
use crate::transport::Connection;

/// Walks a range window by window, claiming unset indices and sending one
/// `toggle_bits` event per window.
#[derive(Debug, Clone)]
pub struct BatchToggler {
    batch_size: usize,
    max_retries: usize,
    pacing: Duration,
    retry_delay: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ToggleReport {
    pub windows: usize,
    pub claimed: usize,
    pub batches_sent: usize,
    pub batches_abandoned: usize,
    pub cancelled: bool,
    /// The range ran past the end of the snapshot and scanning stopped early.
    pub truncated: bool,
}

enum Delivery {
    Sent,
    Abandoned,
}

impl BatchToggler {
    pub fn new(
        batch_size: usize,
        max_retries: usize,
        pacing: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_retries: max_retries.max(1),
            pacing,
            retry_delay,
        }
    }

    pub fn from_config(config: &ClaimConfig) -> Self {
        Self::new(
            config.batch_size,
            config.max_retries,
            config.pacing,
            config.retry_delay,
        )
    }

    /// Runs one pass over `range`.
    ///
    /// Claimed indices stay marked in `bitset` whether or not their batch is
    /// delivered. Send failures are retried and then dropped; nothing is
    /// returned as an error.
    pub async fn run(
        &self,
        bitset: &BitSet,
        range: IndexRange,
        conn: &mut dyn Connection,
        cancel: &CancellationToken,
    ) -> ToggleReport {
        info!(start = range.start, end = range.end, "checking range");
        let mut report = ToggleReport::default();

        for window in range.windows(self.batch_size) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.windows += 1;

            let mut batch = Vec::with_capacity(window.len());
            for index in window.start..=window.end {
                match bitset.claim(index) {
                    Ok(true) => batch.push(index),
                    Ok(false) => {}
                    // only IndexOutOfRange: the range runs past the snapshot
                    Err(err) => {
                        error!(error = %err, %range, "range exceeds snapshot; stopping this pass");
                        report.truncated = true;
                        break;
                    }
                }
            }

            if !batch.is_empty() {
                report.claimed += batch.len();
                metrics::INDICES_CLAIMED.inc_by(batch.len() as u64);
                match self.deliver(&batch, window, conn, cancel).await {
                    Delivery::Sent => report.batches_sent += 1,
                    Delivery::Abandoned => report.batches_abandoned += 1,
                }
            }

            if !pause(self.pacing, cancel).await {
                report.cancelled = true;
                break;
            }
            if report.truncated {
                break;
            }
        }

        report
    }

    async fn deliver(
        &self,
        batch: &[usize],
        window: IndexRange,
        conn: &mut dyn Connection,
        cancel: &CancellationToken,
    ) -> Delivery {
        let frame = toggle_bits_frame(batch);
        for attempt in 1..=self.max_retries {
            debug!(attempt, len = batch.len(), frame = %frame, "sending batch");
            match conn.send_text(&frame).await {
                Ok(()) => {
                    metrics::BATCHES_SENT.inc();
                    info!(
                        start = window.start,
                        end = window.end,
                        toggled = batch.len(),
                        "checked window"
                    );
                    return Delivery::Sent;
                }
                Err(err) => {
                    metrics::SEND_FAILURES.inc();
                    warn!(
                        error = %err,
                        attempt,
                        max_retries = self.max_retries,
                        "failed to send batch"
                    );
                    if attempt < self.max_retries && !pause(self.retry_delay, cancel).await {
                        break;
                    }
                }
            }
        }

        metrics::BATCHES_ABANDONED.inc();
        error!(
            start = window.start,
            end = window.end,
            dropped = batch.len(),
            "abandoning batch; next snapshot will resync"
        );
        Delivery::Abandoned
    }
}
