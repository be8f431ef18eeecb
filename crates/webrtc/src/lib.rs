//! Real-time media-session layer for the companion-robot backend
//!
//! Clients connect over a WebSocket signaling channel, negotiate a WebRTC
//! peer connection, and receive a stored video file streamed over the
//! resulting link. One session per client; a repeat offer for the same
//! session id tears the previous connection down and replaces it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Clients (browser / companion app)                       │
//! │  ↓ (WebSocket, JSON signaling messages)                  │
//! │  SignalingServer                                         │
//! │  ├─ connection handlers (dispatch pool)                  │
//! │  ├─ VideoStore (managed asset directory)                 │
//! │  └─ NegotiationBridge (single scheduler thread)          │
//! │     ├─ SessionRegistry (id → PeerSession)                │
//! │     └─ per session: PeerConnection + VideoFrameSource    │
//! │        └─ frame pump → outbound video track              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All negotiation-engine steps run on the bridge's dedicated scheduler;
//! dispatch handlers only marshal events onto it and forward replies.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;

// Re-exports for public API
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use media::{SelectedVideo, VideoFrame, VideoFrameSource, VideoStore};
pub use session::{NegotiationBridge, PeerSession, SessionId, SessionRegistry, SessionState};
pub use signaling::{ClientMessage, ServerHandle, ServerMessage, ServerState, SignalingServer};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
