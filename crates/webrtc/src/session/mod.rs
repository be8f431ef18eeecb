//! Session lifecycle: per-client peer sessions, the registry that owns
//! them, and the bridge that serializes negotiation onto one scheduler

pub mod bridge;
pub mod registry;

pub use bridge::NegotiationBridge;
pub use registry::SessionRegistry;

use crate::media::VideoFrameSource;
use crate::peer::PeerConnection;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Opaque session identifier, stable for the signaling connection's lifetime
pub type SessionId = String;

/// Negotiation state of one session
///
/// `Connected` is observed implicitly through the engine's connection-state
/// callback; `Closed` is terminal — the next offer for the same id starts a
/// fresh session at `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no remote description yet
    New,
    /// Client offer applied as remote description
    HaveRemoteOffer,
    /// Local answer generated and applied
    HaveLocalAnswer,
    /// Transport-level ICE completion observed
    Connected,
    /// Torn down; the connection is never reused
    Closed,
}

/// One client's session: exclusively-owned negotiation connection plus at
/// most one frame source and its pump
pub struct PeerSession {
    id: SessionId,
    connection: PeerConnection,
    state: Mutex<SessionState>,
    video_source: Mutex<Option<Arc<VideoFrameSource>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl PeerSession {
    /// Wrap a freshly created connection. Wires the engine's state callback
    /// so the `HaveLocalAnswer → Connected` transition is observed.
    pub fn new(id: SessionId, connection: PeerConnection) -> Arc<Self> {
        let session = Arc::new(Self {
            id,
            connection,
            state: Mutex::new(SessionState::New),
            video_source: Mutex::new(None),
            pump: Mutex::new(None),
        });

        let observer = Arc::downgrade(&session);
        session.connection.on_state_change(move |engine_state| {
            if engine_state == RTCPeerConnectionState::Connected {
                if let Some(session) = observer.upgrade() {
                    let mut state = session.state.lock();
                    if *state == SessionState::HaveLocalAnswer {
                        debug!(session_id = %session.id, "session connected");
                        *state = SessionState::Connected;
                    }
                }
            }
        });

        session
    }

    /// Session identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's negotiation connection
    pub fn connection(&self) -> &PeerConnection {
        &self.connection
    }

    /// Current negotiation state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Advance the negotiation state
    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Attach the outbound media pipeline (frame source plus its pump)
    pub fn attach_media(&self, source: Arc<VideoFrameSource>, pump: JoinHandle<()>) {
        *self.video_source.lock() = Some(source);
        *self.pump.lock() = Some(pump);
    }

    /// Whether a frame source is attached
    pub fn has_frame_source(&self) -> bool {
        self.video_source.lock().is_some()
    }

    /// The attached frame source, if any
    pub fn frame_source(&self) -> Option<Arc<VideoFrameSource>> {
        self.video_source.lock().clone()
    }

    /// Tear the session down: pump, then frame source, then connection.
    /// Reversing this order risks a frame write landing on a released
    /// capture handle. Engine close errors are logged, never propagated,
    /// so the id can always retry cleanly.
    pub async fn teardown(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }

        if let Some(source) = self.video_source.lock().take() {
            source.stop();
        }

        if let Err(e) = self.connection.close().await {
            warn!(session_id = %self.id, error = %e, "error closing peer connection during teardown");
        }

        self.set_state(SessionState::Closed);
        debug!(session_id = %self.id, "session torn down");
    }
}
