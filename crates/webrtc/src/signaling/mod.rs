//! Signaling: the message contract and its WebSocket transport

pub mod protocol;
pub mod websocket;

pub use protocol::{ClientMessage, ServerMessage};
pub use websocket::{ServerHandle, ServerState, SignalingServer};
