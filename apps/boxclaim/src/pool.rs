use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ClaimConfig;
use crate::error::ClaimResult;
use crate::range::{partition, IndexRange};
use crate::snapshot::{HttpStateFetcher, StateSource};
use crate::toggler::BatchToggler;
use crate::transport::{Connector, WebSocketConnector};
use crate::worker::Worker;

/// Static partition of the domain with one worker per range.
pub struct WorkerPool {
    domain_size: usize,
    workers: usize,
    reconnect_wait: Duration,
    toggler: BatchToggler,
    source: Arc<dyn StateSource>,
    connector: Arc<dyn Connector>,
}

impl WorkerPool {
    pub fn new(
        config: &ClaimConfig,
        source: Arc<dyn StateSource>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            domain_size: config.domain_size,
            workers: config.workers,
            reconnect_wait: config.reconnect_wait,
            toggler: BatchToggler::from_config(config),
            source,
            connector,
        }
    }

    /// Pool wired to the HTTP snapshot endpoint and the WebSocket stream.
    pub fn from_config(config: &ClaimConfig) -> ClaimResult<Self> {
        let source = HttpStateFetcher::new(config.state_url.clone(), config.request_timeout)?;
        let connector = WebSocketConnector::new(config.socket_url.clone(), config.request_timeout)
            .with_socket_io_handshake(config.socket_io_handshake);
        Ok(Self::new(config, Arc::new(source), Arc::new(connector)))
    }

    pub fn ranges(&self) -> Vec<IndexRange> {
        partition(self.domain_size, self.workers)
    }

    /// Spawns every worker and waits for all of them. Workers only return
    /// once `cancel` fires, so neither does this.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tasks = JoinSet::new();
        for (id, range) in self.ranges().into_iter().enumerate() {
            let worker = Worker::new(
                id,
                range,
                self.source.clone(),
                self.connector.clone(),
                self.toggler.clone(),
                self.reconnect_wait,
            );
            tasks.spawn(worker.run(cancel.clone()));
        }
        info!(
            workers = tasks.len(),
            domain = self.domain_size,
            "started claiming"
        );

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "worker task failed");
            }
        }
        info!("all workers stopped");
    }
}
