//! WebSocket signaling transport
//!
//! One WebSocket connection per client session: the connection accept
//! assigns the session id, text frames carry the JSON message contract,
//! and the socket closing drives the disconnect teardown path.

mod handler;
mod server;

pub use handler::handle_connection;
pub use server::{ServerHandle, ServerState, SignalingServer};
