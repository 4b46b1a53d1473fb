//! Live-socket tests for the transport client
//!
//! These run a real websocket server on a loopback port and exercise the
//! connect/reconnect loop end to end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use chorus_ws::{InboundMessage, WsClient, WsConfig};

/// Route client logs through the test harness; `RUST_LOG` filters apply
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}"))
}

#[tokio::test]
async fn test_accept_then_close_reconnects_with_debounce() {
    init_tracing();
    let (listener, url) = bind_server().await;
    let accept_times: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let times = Arc::clone(&accept_times);
    let server = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            times.lock().await.push(Instant::now());
            // Complete the handshake, then drop the connection immediately
            let ws = tokio_tungstenite::accept_async(stream).await;
            drop(ws);
        }
    });

    let config = WsConfig::default().with_reconnect_debounce(Duration::from_millis(500));
    let (client, handle) = WsClient::new(&url, config).unwrap();
    let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();
    let client_task = tokio::spawn(client.start(inbound_tx, || {}));

    tokio::time::sleep(Duration::from_millis(2200)).await;
    handle.close();
    let _ = client_task.await;
    server.abort();

    let times = accept_times.lock().await;
    assert!(
        times.len() >= 3,
        "expected repeated reconnects, got {} accepts",
        times.len()
    );
    // Every reconnect after an immediate close must be held back by the
    // debounce window; allow generous scheduling slack
    for pair in times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(350),
            "reconnect fired too soon: {gap:?}"
        );
    }
}

#[tokio::test]
async fn test_open_fires_on_open_and_forwards_frames_in_order() {
    init_tracing();
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"type": "CONNECTION_ID", "connectionId": "conn-1"}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type": "BRAND_NEW_THING", "payload": {}}"#.to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type": "SESSIONS", "payload": []}"#.to_string(),
        ))
        .await
        .unwrap();
        // Keep the socket open until the client goes away
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let (open_tx, mut open_rx) = mpsc::unbounded_channel();
    let (client, handle) = WsClient::new(&url, WsConfig::default()).unwrap();
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let client_task = tokio::spawn(client.start(inbound_tx, move || {
        let _ = open_tx.send(());
    }));

    tokio::time::timeout(Duration::from_secs(5), open_rx.recv())
        .await
        .expect("on_open should fire")
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("first frame")
        .unwrap();
    assert_eq!(
        first,
        InboundMessage::ConnectionId {
            connection_id: "conn-1".to_string()
        }
    );

    // The unknown frame was dropped; the sessions snapshot arrives next
    let second = tokio::time::timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("second frame")
        .unwrap();
    assert_eq!(second, InboundMessage::Sessions { payload: vec![] });

    handle.close();
    let _ = client_task.await;
    server.abort();
}

#[tokio::test]
async fn test_failed_open_retries_until_server_appears() {
    init_tracing();
    // Reserve a port, then close the listener so the first attempts fail
    let (listener, url) = bind_server().await;
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = WsConfig::default().with_reconnect_debounce(Duration::from_millis(200));
    let (client, handle) = WsClient::new(&url, config).unwrap();
    let (open_tx, mut open_rx) = mpsc::unbounded_channel();
    let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();
    let client_task = tokio::spawn(client.start(inbound_tx, move || {
        let _ = open_tx.send(());
    }));

    // Let a few attempts fail before the server comes up
    tokio::time::sleep(Duration::from_millis(700)).await;

    let listener = TcpListener::bind(addr).await.unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    tokio::time::timeout(Duration::from_secs(5), open_rx.recv())
        .await
        .expect("client should eventually connect")
        .unwrap();

    handle.close();
    let _ = client_task.await;
    server.abort();
}
