use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boxclaim_proto::socket_io::{self, Packet};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{Connection, Connector};
use crate::error::{ClaimError, ClaimResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = Arc<AsyncMutex<SplitSink<WsStream, Message>>>;

/// Dials the Socket.IO endpoint over a plain WebSocket upgrade.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    timeout: Duration,
    socket_io_handshake: bool,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            socket_io_handshake: true,
        }
    }

    pub fn with_socket_io_handshake(mut self, enabled: bool) -> Self {
        self.socket_io_handshake = enabled;
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> ClaimResult<Box<dyn Connection>> {
        let (ws_stream, _) = tokio::time::timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ClaimError::Connect(format!("timed out after {:?}", self.timeout)))?
            .map_err(|err| ClaimError::Connect(err.to_string()))?;

        let (sink, stream) = ws_stream.split();
        let sink: WsSink = Arc::new(AsyncMutex::new(sink));
        let open = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(stream, sink.clone(), open.clone()));

        let mut conn = WebSocketConnection {
            sink,
            open,
            reader: Some(reader),
            timeout: self.timeout,
        };
        if self.socket_io_handshake {
            if let Err(err) = conn.send_text(socket_io::NAMESPACE_CONNECT).await {
                conn.close().await;
                return Err(ClaimError::Connect(err.to_string()));
            }
        }
        debug!(url = %self.url, "stream connected");
        Ok(Box::new(conn))
    }
}

pub struct WebSocketConnection {
    sink: WsSink,
    open: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    /// Bound on a single write and on the closing handshake.
    timeout: Duration,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send_text(&mut self, payload: &str) -> ClaimResult<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(ClaimError::Send("connection closed by peer".into()));
        }
        let sink = &self.sink;
        let send = async {
            sink.lock()
                .await
                .send(Message::Text(payload.to_string()))
                .await
        };
        match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result.map_err(|err| ClaimError::Send(err.to_string())),
            Err(_) => Err(ClaimError::Send(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn close(&mut self) {
        self.open.store(false, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            reader.abort();
            let _ = reader.await;
        }
        let sink = &self.sink;
        let close = async { sink.lock().await.close().await };
        if tokio::time::timeout(self.timeout, close).await.is_err() {
            debug!(timeout = ?self.timeout, "closing handshake timed out; dropping stream");
        }
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Drains inbound frames so keepalives are answered; server events are not
/// consumed by the claim loop.
async fn read_loop(mut stream: SplitStream<WsStream>, sink: WsSink, open: Arc<AtomicBool>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match Packet::parse(&text) {
                Packet::Ping => {
                    let pong = Message::Text(socket_io::PONG.to_string());
                    if sink.lock().await.send(pong).await.is_err() {
                        break;
                    }
                }
                Packet::Close => break,
                Packet::Open(params) => debug!(params, "engine.io open"),
                Packet::Connected => debug!("socket.io namespace connected"),
                Packet::Pong | Packet::Event(_) | Packet::Other(_) => {
                    trace!(len = text.len(), "ignoring inbound frame")
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
    open.store(false, Ordering::Release);
    debug!("stream reader finished");
}
