use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_STATE_URL: &str = "https://onemillioncheckboxes.com/api/initial-state";
pub const DEFAULT_SOCKET_URL: &str =
    "wss://onemillioncheckboxes.com/socket.io/?EIO=4&transport=websocket";
pub const DEFAULT_PACING: Duration = Duration::from_millis(200);
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKERS: usize = 100;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DOMAIN_SIZE: usize = 1_000_000;

/// Everything the pool, workers and togglers need, built once at startup.
#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub state_url: String,
    pub socket_url: String,
    /// Size of the index domain split across workers.
    pub domain_size: usize,
    pub workers: usize,
    pub batch_size: usize,
    /// Send attempts per batch before it is abandoned.
    pub max_retries: usize,
    /// Delay after every window, sent or not.
    pub pacing: Duration,
    /// Delay between failed send attempts of the same batch.
    pub retry_delay: Duration,
    /// Backoff after a failed fetch or connect.
    pub reconnect_wait: Duration,
    /// Bound on the snapshot request and the stream handshake.
    pub request_timeout: Duration,
    /// Send the Socket.IO namespace connect after the upgrade.
    pub socket_io_handshake: bool,
}

impl ClaimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("domain_size", self.domain_size),
            ("workers", self.workers),
            ("batch_size", self.batch_size),
            ("max_retries", self.max_retries),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        check_url("state_url", &self.state_url, &["http", "https"])?;
        check_url("socket_url", &self.socket_url, &["ws", "wss"])?;
        Ok(())
    }
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            state_url: DEFAULT_STATE_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            domain_size: DEFAULT_DOMAIN_SIZE,
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            pacing: DEFAULT_PACING,
            retry_delay: DEFAULT_PACING,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            socket_io_handshake: true,
        }
    }
}

fn check_url(field: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!(
            "scheme must be one of {}",
            schemes.join(", ")
        )));
    }
    Ok(())
}
