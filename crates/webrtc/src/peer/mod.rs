//! WebRTC peer connection management

pub mod connection;

pub use connection::PeerConnection;
