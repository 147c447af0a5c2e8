use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn counter(name: &str, help: &str) -> IntCounter {
    let c = IntCounter::with_opts(Opts::new(name, help)).unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
}

pub static CYCLES: Lazy<IntCounter> =
    Lazy::new(|| counter("boxclaim_cycles_total", "completed worker cycles"));
pub static FETCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "boxclaim_fetch_failures_total",
        "snapshot fetches that failed to download or decode",
    )
});
pub static CONNECT_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "boxclaim_connect_failures_total",
        "stream connections that failed to open",
    )
});
pub static BATCHES_SENT: Lazy<IntCounter> =
    Lazy::new(|| counter("boxclaim_batches_sent_total", "toggle batches delivered"));
pub static BATCHES_ABANDONED: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "boxclaim_batches_abandoned_total",
        "toggle batches dropped after exhausting retries",
    )
});
pub static SEND_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "boxclaim_send_failures_total",
        "individual send attempts that failed",
    )
});
pub static INDICES_CLAIMED: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "boxclaim_indices_claimed_total",
        "indices marked locally and queued for toggling",
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub cycles: u64,
    pub fetch_failures: u64,
    pub connect_failures: u64,
    pub batches_sent: u64,
    pub batches_abandoned: u64,
    pub send_failures: u64,
    pub indices_claimed: u64,
}

pub fn summary() -> Summary {
    Summary {
        cycles: CYCLES.get(),
        fetch_failures: FETCH_FAILURES.get(),
        connect_failures: CONNECT_FAILURES.get(),
        batches_sent: BATCHES_SENT.get(),
        batches_abandoned: BATCHES_ABANDONED.get(),
        send_failures: SEND_FAILURES.get(),
        indices_claimed: INDICES_CLAIMED.get(),
    }
}

pub fn gather() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %err, "metrics encode failed");
    }
    buffer
}
