//! End-to-end signaling over a live WebSocket connection

mod harness;

use companion_webrtc::{ServerConfig, ServerHandle, SessionState, SignalingServer};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(video_dir: &std::path::Path) -> ServerHandle {
    let config = ServerConfig::default()
        .with_listen_addr("127.0.0.1:0")
        .with_stun_servers(vec![])
        .with_video_dir(video_dir);

    let server = SignalingServer::new(config).unwrap();
    server.start().await.unwrap()
}

async fn connect(handle: &ServerHandle) -> WsClient {
    let url = format!("ws://{}", handle.local_addr());
    let (ws, _) = connect_async(&url).await.unwrap();
    ws
}

/// Next JSON text frame from the server, with a test deadline
async fn recv_json(ws: &mut WsClient) -> Value {
    let deadline = Duration::from_secs(10);
    tokio::time::timeout(deadline, async {
        while let Some(message) = ws.next().await {
            if let Ok(Message::Text(text)) = message {
                return serde_json::from_str(&text).unwrap();
            }
        }
        panic!("connection closed while waiting for a message");
    })
    .await
    .expect("timed out waiting for a server message")
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_session_over_websocket() {
    harness::init_logging();
    let dir = tempfile::tempdir().unwrap();
    harness::write_test_ivf(
        &dir.path().join("clip.ivf"),
        &[&[0x00, 0x01], &[0x02, 0x03], &[0x04, 0x05]],
        320,
        240,
        30,
    );
    fs::write(dir.path().join("notes.txt"), b"not a video").unwrap();

    let handle = start_server(dir.path()).await;
    let state = handle.state();
    let mut ws = connect(&handle).await;

    // Accept assigns the session id
    let connected = recv_json(&mut ws).await;
    assert_eq!(connected["event"], "connected");
    let session_id = connected["session_id"].as_str().unwrap().to_string();

    // Asset listing filters to recognized extensions, sorted
    send_json(&mut ws, json!({"event": "get_videos"})).await;
    let videos = recv_json(&mut ws).await;
    assert_eq!(videos["event"], "videos_list");
    assert_eq!(videos["videos"], json!(["clip.ivf"]));

    // Unknown asset is rejected, naming the missing file, channel stays open
    send_json(
        &mut ws,
        json!({"event": "start_stream", "video_filename": "ghost.mp4"}),
    )
    .await;
    let error = recv_json(&mut ws).await;
    assert_eq!(error["event"], "error");
    assert!(error["message"].as_str().unwrap().contains("ghost.mp4"));

    // Select the stored clip
    send_json(
        &mut ws,
        json!({"event": "start_stream", "video_filename": "clip.ivf"}),
    )
    .await;
    let started = recv_json(&mut ws).await;
    assert_eq!(started["event"], "stream_started");
    assert_eq!(started["video_filename"], "clip.ivf");
    assert_eq!(state.selected.get(), Some(dir.path().join("clip.ivf")));

    // Offer → answer, synchronously, to this client only
    let offer_sdp = harness::client_offer_sdp().await;
    send_json(
        &mut ws,
        json!({"event": "offer", "sdp": offer_sdp, "type": "offer"}),
    )
    .await;
    let answer = recv_json(&mut ws).await;
    assert_eq!(answer["event"], "answer");
    assert_eq!(answer["type"], "answer");
    assert!(answer["sdp"].as_str().unwrap().starts_with("v=0"));

    // Server-side: session negotiated and carrying a frame source
    let session = state.registry.get(&session_id).expect("session live");
    assert_eq!(session.state(), SessionState::HaveLocalAnswer);
    assert!(session.has_frame_source());
    let source = session.frame_source().unwrap();

    // stop_stream tears the caller's session down
    send_json(&mut ws, json!({"event": "stop_stream"})).await;
    let stopped = recv_json(&mut ws).await;
    assert_eq!(stopped["event"], "stream_stopped");
    assert!(state.registry.is_empty());
    assert_eq!(session.state(), SessionState::Closed);
    assert!(source.is_stopped());

    // A fresh offer for the same id starts over and succeeds
    let offer_sdp = harness::client_offer_sdp().await;
    send_json(
        &mut ws,
        json!({"event": "offer", "sdp": offer_sdp, "type": "offer"}),
    )
    .await;
    let answer = recv_json(&mut ws).await;
    assert_eq!(answer["event"], "answer");
    let session = state.registry.get(&session_id).expect("fresh session live");
    assert_eq!(session.state(), SessionState::HaveLocalAnswer);

    ws.close(None).await.unwrap();
    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn malformed_message_keeps_channel_open() {
    harness::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let handle = start_server(dir.path()).await;
    let mut ws = connect(&handle).await;

    recv_json(&mut ws).await; // connected

    ws.send(Message::Text("{\"event\": \"offer\"".to_string()))
        .await
        .unwrap();
    let error = recv_json(&mut ws).await;
    assert_eq!(error["event"], "error");

    // The channel survived: a normal request still round-trips
    send_json(&mut ws, json!({"event": "get_videos"})).await;
    let videos = recv_json(&mut ws).await;
    assert_eq!(videos["event"], "videos_list");

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bad_offer_reports_error_and_forces_closed() {
    harness::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let handle = start_server(dir.path()).await;
    let state = handle.state();
    let mut ws = connect(&handle).await;

    let connected = recv_json(&mut ws).await;
    let session_id = connected["session_id"].as_str().unwrap().to_string();

    send_json(
        &mut ws,
        json!({"event": "offer", "sdp": "this is not sdp", "type": "offer"}),
    )
    .await;
    let error = recv_json(&mut ws).await;
    assert_eq!(error["event"], "error");
    assert!(state.registry.get(&session_id).is_none());

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disconnect_cleans_up_the_session() {
    harness::init_logging();
    let dir = tempfile::tempdir().unwrap();
    harness::write_test_ivf(&dir.path().join("clip.ivf"), &[&[0x00, 0x01]], 320, 240, 30);

    let handle = start_server(dir.path()).await;
    let state = handle.state();
    let mut ws = connect(&handle).await;

    recv_json(&mut ws).await; // connected

    send_json(
        &mut ws,
        json!({"event": "start_stream", "video_filename": "clip.ivf"}),
    )
    .await;
    recv_json(&mut ws).await; // stream_started

    let offer_sdp = harness::client_offer_sdp().await;
    send_json(
        &mut ws,
        json!({"event": "offer", "sdp": offer_sdp, "type": "offer"}),
    )
    .await;
    recv_json(&mut ws).await; // answer
    assert_eq!(state.registry.len(), 1);

    drop(ws);

    // Teardown runs on the handler's exit path
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !state.registry.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(state.registry.is_empty());

    handle.shutdown().await;
}
