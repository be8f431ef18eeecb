//! Per-connection signaling handler
//!
//! Reads JSON messages off one WebSocket, dispatches them to the
//! negotiation bridge, and forwards replies back through a per-connection
//! outbound channel. Offer handling waits for the bridge so the answer is
//! on the wire before the next inbound frame is read; that also makes
//! candidates arriving after an offer process strictly after it.

use super::server::ServerState;
use crate::signaling::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Message, Result as WsResult},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handle one signaling connection for its whole lifetime
pub async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) -> WsResult<()> {
    let peer_addr = stream.peer_addr()?;
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Outbound channel for this connection; a forwarding task owns the sink
    let (tx, mut rx) = mpsc::channel::<Message>(64);

    let session_id = Uuid::new_v4().to_string();
    info!(peer = %peer_addr, session_id = %session_id, "client connected");

    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    send(&tx, &ServerMessage::Connected {
        session_id: session_id.clone(),
    })
    .await;

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_message(&text, &state, &session_id, &tx).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = tx.send(Message::Pong(payload)).await;
            }
            Ok(Message::Close(_)) => {
                debug!(session_id = %session_id, "close frame received");
                break;
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "signaling socket error");
                break;
            }
            _ => {}
        }
    }

    // Disconnect is the cancellation signal: blocks until the close step
    // completed on the scheduler, so no frame callback outlives this handler.
    info!(session_id = %session_id, "client disconnected; cleaning up");
    state.bridge.teardown(&session_id).await;

    forward_task.abort();

    Ok(())
}

/// Dispatch one inbound message
async fn handle_message(
    text: &str,
    state: &Arc<ServerState>,
    session_id: &str,
    tx: &mpsc::Sender<Message>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(session_id, error = %e, "malformed signaling message; dropping");
            send(tx, &ServerMessage::error(format!("malformed message: {}", e))).await;
            return;
        }
    };

    match message {
        ClientMessage::Offer { sdp, sdp_type } => {
            debug!(session_id, "offer received");
            match state.bridge.offer(session_id, sdp, sdp_type).await {
                Ok(answer_sdp) => {
                    send(tx, &ServerMessage::answer(answer_sdp)).await;
                }
                Err(e) => {
                    // The bridge already forced the session to Closed; the
                    // channel itself stays usable for a fresh offer.
                    error!(session_id, error = %e, "offer failed");
                    send(tx, &ServerMessage::error(e.to_string())).await;
                }
            }
        }
        ClientMessage::IceCandidate {
            candidate,
            sdp_mid,
            sdp_mline_index,
        } => {
            state
                .bridge
                .ice_candidate(session_id, candidate, sdp_mid, sdp_mline_index);
        }
        ClientMessage::StartStream { video_filename } => {
            match state.store.resolve(&video_filename) {
                Ok(path) => {
                    if state.bridge.select_video(path).await.is_ok() {
                        info!(session_id, video = %video_filename, "stream source selected");
                        send(tx, &ServerMessage::StreamStarted { video_filename }).await;
                    } else {
                        send(tx, &ServerMessage::error("negotiation worker unavailable")).await;
                    }
                }
                Err(e) => {
                    warn!(session_id, error = %e, "start_stream rejected");
                    send(tx, &ServerMessage::error(e.to_string())).await;
                }
            }
        }
        ClientMessage::StopStream => {
            info!(session_id, "stop_stream received");
            state.bridge.teardown(session_id).await;
            send(tx, &ServerMessage::StreamStopped).await;
        }
        ClientMessage::GetVideos => {
            let videos = state.store.list();
            send(tx, &ServerMessage::VideosList { videos }).await;
        }
    }
}

/// Serialize and enqueue one outbound message
async fn send(tx: &mpsc::Sender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(text) => {
            if tx.send(Message::Text(text)).await.is_err() {
                debug!("outbound channel closed; message dropped");
            }
        }
        Err(e) => {
            error!(error = %e, "failed to serialize outbound message");
        }
    }
}
