use async_trait::async_trait;

use crate::error::ClaimResult;

pub mod websocket;

pub use websocket::WebSocketConnector;

/// Opens one streaming connection per worker cycle.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> ClaimResult<Box<dyn Connection>>;
}

/// Write side of an open stream. Framing below the application text frame,
/// and any keepalive traffic, belong to the implementation.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, payload: &str) -> ClaimResult<()>;

    async fn close(&mut self);
}
