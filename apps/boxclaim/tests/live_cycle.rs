use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use boxclaim::transport::{Connection, Connector, WebSocketConnector};
use boxclaim::{ClaimConfig, ClaimError, WorkerPool};
use boxclaim_proto::InitialState;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct FakeService {
    snapshot: InitialState,
    frames: mpsc::UnboundedSender<String>,
    hang_up: bool,
}

async fn initial_state(State(svc): State<FakeService>) -> Json<InitialState> {
    Json(svc.snapshot.clone())
}

async fn socket(State(svc): State<FakeService>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, svc))
}

async fn serve_socket(mut socket: WebSocket, svc: FakeService) {
    if svc.hang_up {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    let open = r#"0{"sid":"test","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
    let _ = socket.send(Message::Text(open.into())).await;
    let _ = socket.send(Message::Text("2".into())).await;
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            if svc.frames.send(text).is_err() {
                break;
            }
        }
    }
}

async fn spawn_service(
    snapshot: InitialState,
    hang_up: bool,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (frames, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/api/initial-state", get(initial_state))
        .route("/socket.io/", get(socket))
        .with_state(FakeService {
            snapshot,
            frames,
            hang_up,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    (addr, rx)
}

fn socket_url(addr: SocketAddr) -> String {
    format!("ws://{addr}/socket.io/?EIO=4&transport=websocket")
}

#[tokio::test]
async fn worker_claims_unset_bits_over_socket_io() {
    // bits 0-7 set, 8-15 clear, 16-19 clear, 20-23 set, 24-31 clear
    let snapshot = InitialState::from_bytes(&[0xff, 0x00, 0x0f, 0x00], 32);
    let (addr, mut frames) = spawn_service(snapshot, false).await;

    let config = ClaimConfig {
        state_url: format!("http://{addr}/api/initial-state"),
        socket_url: socket_url(addr),
        domain_size: 32,
        workers: 1,
        batch_size: 8,
        pacing: Duration::from_millis(5),
        retry_delay: Duration::from_millis(5),
        reconnect_wait: Duration::from_millis(50),
        request_timeout: Duration::from_secs(5),
        ..ClaimConfig::default()
    };
    config.validate().expect("valid test config");
    let pool = WorkerPool::from_config(&config).expect("pool");
    let cancel = CancellationToken::new();
    let running = tokio::spawn(pool.run(cancel.clone()));

    let mut seen = Vec::new();
    let collected = timeout(Duration::from_secs(10), async {
        loop {
            let frame = frames.recv().await.expect("service alive");
            seen.push(frame);
            let toggles = seen.iter().filter(|f| f.starts_with("42")).count();
            if toggles >= 3 && seen.iter().any(|f| f == "3") {
                break;
            }
        }
    })
    .await;
    cancel.cancel();
    collected.expect("expected frames before timeout");

    let toggles: Vec<&str> = seen
        .iter()
        .filter(|f| f.starts_with("42"))
        .take(3)
        .map(String::as_str)
        .collect();
    assert_eq!(
        toggles,
        [
            r#"42["toggle_bits", [{"index": 8},{"index": 9},{"index": 10},{"index": 11},{"index": 12},{"index": 13},{"index": 14},{"index": 15}]]"#,
            r#"42["toggle_bits", [{"index": 16},{"index": 17},{"index": 18},{"index": 19}]]"#,
            r#"42["toggle_bits", [{"index": 24},{"index": 25},{"index": 26},{"index": 27},{"index": 28},{"index": 29},{"index": 30},{"index": 31}]]"#,
        ]
    );
    let connect_at = seen.iter().position(|f| f == "40").expect("namespace connect");
    let first_toggle = seen.iter().position(|f| f.starts_with("42")).unwrap();
    assert!(connect_at < first_toggle);

    timeout(Duration::from_secs(5), running)
        .await
        .expect("pool stops after cancel")
        .expect("pool task");
}

#[tokio::test]
async fn send_fails_once_peer_hangs_up() {
    let snapshot = InitialState::from_bytes(&[0], 8);
    let (addr, _frames) = spawn_service(snapshot, true).await;
    let connector = WebSocketConnector::new(socket_url(addr), Duration::from_secs(5))
        .with_socket_io_handshake(false);
    let mut conn = connector.connect().await.expect("upgrade succeeds");

    let failed = timeout(Duration::from_secs(5), async {
        loop {
            if let Err(err) = conn.send_text(r#"42["toggle_bits", [{"index": 0}]]"#).await {
                return err;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("send should fail after close");
    assert!(matches!(failed, ClaimError::Send(_)));
    conn.close().await;
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let connector = WebSocketConnector::new("ws://127.0.0.1:1/socket.io/", Duration::from_secs(5));
    match connector.connect().await {
        Err(ClaimError::Connect(_)) => {}
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn stalled_peer_times_out_send_and_close() {
    // completes the upgrade, then never reads so the socket buffers fill
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.expect("accept");
        let _ws = tokio_tungstenite::accept_async(tcp).await.expect("upgrade");
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let connector = WebSocketConnector::new(format!("ws://{addr}/"), Duration::from_millis(300))
        .with_socket_io_handshake(false);
    let mut conn = connector.connect().await.expect("upgrade succeeds");

    let payload = "a".repeat(1 << 20);
    let failed = timeout(Duration::from_secs(20), async {
        loop {
            if let Err(err) = conn.send_text(&payload).await {
                return err;
            }
        }
    })
    .await
    .expect("send should time out once buffers are full");
    match failed {
        ClaimError::Send(message) => assert!(message.contains("timed out"), "{message}"),
        other => panic!("unexpected error {other}"),
    }

    timeout(Duration::from_secs(2), conn.close())
        .await
        .expect("close is bounded even when the peer is stalled");
}
