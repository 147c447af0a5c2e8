use std::time::Duration;

use clap::Parser;

use crate::config::{
    ClaimConfig, DEFAULT_BATCH_SIZE, DEFAULT_DOMAIN_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_PACING,
    DEFAULT_RECONNECT_WAIT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SOCKET_URL, DEFAULT_STATE_URL,
    DEFAULT_WORKERS,
};
use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(
    name = "boxclaim",
    version,
    about = "Claim every unset bit of a remote bit vector with parallel workers"
)]
pub struct Cli {
    /// Sleep between windows, in milliseconds.
    #[arg(long, env = "BOXCLAIM_SLEEP_DURATION_MS", default_value_t = DEFAULT_PACING.as_millis() as u64)]
    pub sleep_duration_ms: u64,

    /// Wait before restarting a cycle after a fetch or connect failure, in milliseconds.
    #[arg(long, env = "BOXCLAIM_RECONNECT_WAIT_MS", default_value_t = DEFAULT_RECONNECT_WAIT.as_millis() as u64)]
    pub reconnect_wait_ms: u64,

    /// Number of parallel workers.
    #[arg(long, env = "BOXCLAIM_NUM_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub num_workers: usize,

    /// Send attempts per batch before it is dropped.
    #[arg(long, env = "BOXCLAIM_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// Indices scanned per window and toggled per message.
    #[arg(long, env = "BOXCLAIM_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Delay between send attempts of one batch; defaults to the sleep duration.
    #[arg(long, env = "BOXCLAIM_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Number of indices split across workers.
    #[arg(long, env = "BOXCLAIM_DOMAIN_SIZE", default_value_t = DEFAULT_DOMAIN_SIZE)]
    pub domain_size: usize,

    /// Snapshot endpoint.
    #[arg(long, env = "BOXCLAIM_STATE_URL", default_value = DEFAULT_STATE_URL)]
    pub state_url: String,

    /// Socket.IO WebSocket endpoint.
    #[arg(long, env = "BOXCLAIM_SOCKET_URL", default_value = DEFAULT_SOCKET_URL)]
    pub socket_url: String,

    /// Bound on the snapshot request and stream handshake, in seconds.
    #[arg(long, env = "BOXCLAIM_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Skip the Socket.IO namespace connect after the upgrade.
    #[arg(long, env = "BOXCLAIM_NO_SOCKET_IO_HANDSHAKE", default_value_t = false)]
    pub no_socket_io_handshake: bool,

    /// Log filter directives.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log: String,
}

impl TryFrom<Cli> for ClaimConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let pacing = Duration::from_millis(cli.sleep_duration_ms);
        let config = ClaimConfig {
            state_url: cli.state_url,
            socket_url: cli.socket_url,
            domain_size: cli.domain_size,
            workers: cli.num_workers,
            batch_size: cli.batch_size,
            max_retries: cli.max_retries,
            pacing,
            retry_delay: cli.retry_delay_ms.map_or(pacing, Duration::from_millis),
            reconnect_wait: Duration::from_millis(cli.reconnect_wait_ms),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            socket_io_handshake: !cli.no_socket_io_handshake,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["boxclaim"]).expect("parse");
        let config = ClaimConfig::try_from(cli).expect("valid");
        let defaults = ClaimConfig::default();
        assert_eq!(config.pacing, defaults.pacing);
        assert_eq!(config.retry_delay, defaults.pacing);
        assert_eq!(config.reconnect_wait, defaults.reconnect_wait);
        assert_eq!(config.workers, defaults.workers);
        assert_eq!(config.max_retries, defaults.max_retries);
        assert_eq!(config.batch_size, defaults.batch_size);
        assert_eq!(config.domain_size, defaults.domain_size);
        assert!(config.socket_io_handshake);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "boxclaim",
            "--sleep-duration-ms",
            "50",
            "--retry-delay-ms",
            "10",
            "--num-workers",
            "8",
            "--batch-size",
            "25",
            "--no-socket-io-handshake",
        ])
        .expect("parse");
        let config = ClaimConfig::try_from(cli).expect("valid");
        assert_eq!(config.pacing, Duration::from_millis(50));
        assert_eq!(config.retry_delay, Duration::from_millis(10));
        assert_eq!(config.workers, 8);
        assert_eq!(config.batch_size, 25);
        assert!(!config.socket_io_handshake);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let cli = Cli::try_parse_from(["boxclaim", "--num-workers", "0"]).expect("parse");
        assert_eq!(
            ClaimConfig::try_from(cli).unwrap_err(),
            ConfigError::Zero { field: "workers" }
        );
    }
}
