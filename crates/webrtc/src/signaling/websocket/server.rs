//! WebSocket signaling server
//!
//! Accept loop plus the shared state handed to every connection handler.
//! Dispatch runs on the ambient multi-thread runtime; all negotiation is
//! forwarded to the bridge's dedicated scheduler.

use super::handler::handle_connection;
use crate::media::{SelectedVideo, VideoStore};
use crate::session::{NegotiationBridge, SessionRegistry};
use crate::{Result, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared state across all signaling connections
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<SessionRegistry>,
    pub store: VideoStore,
    pub selected: SelectedVideo,
    pub bridge: NegotiationBridge,
}

/// The signaling server: owns the registry, the video store, the selected
/// video cell, and the negotiation bridge
pub struct SignalingServer {
    state: Arc<ServerState>,
}

impl SignalingServer {
    /// Build the server: validates configuration, creates the managed video
    /// directory, and spawns the negotiation scheduler
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let registry = Arc::new(SessionRegistry::new());
        let selected = SelectedVideo::new();

        let store = VideoStore::new(&config.video_dir);
        store.ensure_exists()?;

        let bridge = NegotiationBridge::spawn(
            Arc::clone(&registry),
            selected.clone(),
            Arc::clone(&config),
        )?;

        Ok(Self {
            state: Arc::new(ServerState {
                config,
                registry,
                store,
                selected,
                bridge,
            }),
        })
    }

    /// Shared state, for observation (and tests)
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind and start accepting connections
    ///
    /// Spawns the accept loop and returns a handle carrying the bound
    /// address and the shutdown signal.
    pub async fn start(self) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&self.state.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "signaling server listening");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let state = Arc::clone(&self.state);

        let accept_loop: JoinHandle<()> = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, state).await {
                                        error!(peer = %peer_addr, error = %e, "signaling connection error");
                                    }
                                });
                            }
                            Err(e) => {
                                error!(error = %e, "failed to accept signaling connection");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("signaling server shutting down");
                        break;
                    }
                }
            }
        });

        Ok(ServerHandle {
            local_addr,
            state: self.state,
            shutdown_tx,
            accept_loop,
        })
    }
}

/// Handle for a running signaling server
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
    accept_loop: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state, for observation (and tests)
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Live sessions are drained by the bridge when the state drops.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.accept_loop.await;
    }
}
