//! Concurrent claim-and-toggle engine.
//!
//! A [`pool::WorkerPool`] splits the index domain into fixed ranges. Each
//! [`worker::Worker`] loops forever: fetch a fresh snapshot, open a stream,
//! let the [`toggler::BatchToggler`] claim and toggle every unset index of its
//! range, close the stream, repeat. Failures back off and restart the cycle;
//! a fresh snapshot is the only correction for toggles that were claimed
//! locally but never delivered.

pub mod bitset;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod range;
pub mod snapshot;
pub mod telemetry;
pub mod toggler;
pub mod transport;
pub mod worker;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use bitset::BitSet;
pub use config::ClaimConfig;
pub use error::{ClaimError, ClaimResult, ConfigError};
pub use pool::WorkerPool;
pub use range::IndexRange;

/// Sleeps for `duration` unless cancelled first. Returns `false` on
/// cancellation.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
