use anyhow::{Context, Result};
use boxclaim::cli::Cli;
use boxclaim::telemetry::init_tracing;
use boxclaim::{metrics, ClaimConfig, WorkerPool};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    // wss:// handshakes need a process-wide rustls provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match ClaimConfig::try_from(cli) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config).await {
        error!(error = ?err, "boxclaim failed");
        std::process::exit(1);
    }
}

async fn run(config: ClaimConfig) -> Result<()> {
    let pool = WorkerPool::from_config(&config).context("failed to build worker pool")?;
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    info!(
        workers = config.workers,
        domain = config.domain_size,
        batch_size = config.batch_size,
        max_retries = config.max_retries,
        sleep_ms = config.pacing.as_millis() as u64,
        reconnect_wait_ms = config.reconnect_wait.as_millis() as u64,
        state_url = %config.state_url,
        socket_url = %config.socket_url,
        "starting boxclaim"
    );
    pool.run(cancel).await;

    let summary = metrics::summary();
    info!(
        cycles = summary.cycles,
        claimed = summary.indices_claimed,
        batches_sent = summary.batches_sent,
        batches_abandoned = summary.batches_abandoned,
        send_failures = summary.send_failures,
        fetch_failures = summary.fetch_failures,
        connect_failures = summary.connect_failures,
        "shutdown complete"
    );
    debug!(
        metrics = %String::from_utf8_lossy(&metrics::gather()),
        "final counters"
    );
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("shutdown signal received; stopping workers");
            cancel.cancel();
        }
        Err(err) => warn!(error = %err, "unable to listen for shutdown signal"),
    }
}
