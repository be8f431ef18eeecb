//! Negotiation bridge
//!
//! Signaling events arrive on the server's dispatch tasks, concurrent
//! across sessions. Every negotiation-engine step instead runs on ONE
//! cooperative scheduler: a dedicated worker thread owning a
//! current-thread tokio runtime. Dispatch tasks submit typed commands over
//! an mpsc channel; offer and teardown carry a completion signal the caller
//! waits on, ICE candidates are fire-and-forget. Running every step (and
//! every frame pump) on the single worker serializes an in-flight offer
//! against a concurrent disconnect for the same id.

use crate::media::{pump, SelectedVideo, VideoFrameSource};
use crate::peer::PeerConnection;
use crate::session::{PeerSession, SessionId, SessionRegistry, SessionState};
use crate::{Error, Result, ServerConfig};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A negotiation step marshaled onto the scheduler
enum Command {
    /// Apply a client offer; replies with the answer SDP
    Offer {
        session_id: SessionId,
        sdp: String,
        sdp_type: String,
        reply: oneshot::Sender<Result<String>>,
    },
    /// Feed a trickled ICE candidate; fire-and-forget
    IceCandidate {
        session_id: SessionId,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
    /// Select the video served to subsequent offers
    SelectVideo {
        path: std::path::PathBuf,
        reply: oneshot::Sender<()>,
    },
    /// Tear down one session; replies once the close step completed
    Teardown {
        session_id: SessionId,
        reply: oneshot::Sender<()>,
    },
    /// Stop the worker
    Shutdown,
}

/// Bridge between dispatch tasks and the negotiation scheduler
pub struct NegotiationBridge {
    tx: mpsc::UnboundedSender<Command>,
    worker: Option<thread::JoinHandle<()>>,
}

impl NegotiationBridge {
    /// Spawn the worker thread and its scheduler runtime
    pub fn spawn(
        registry: Arc<SessionRegistry>,
        selected: SelectedVideo,
        config: Arc<ServerConfig>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (startup_tx, startup_rx) = std::sync::mpsc::channel();

        let worker = thread::Builder::new()
            .name("negotiation".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => {
                        let _ = startup_tx.send(Ok(()));
                        rt
                    }
                    Err(e) => {
                        let _ = startup_tx.send(Err(e));
                        return;
                    }
                };

                rt.block_on(run_scheduler(rx, registry, selected, config));
                info!("negotiation scheduler exited");
            })
            .map_err(Error::IoError)?;

        match startup_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                worker: Some(worker),
            }),
            Ok(Err(e)) => Err(Error::IoError(e)),
            Err(_) => Err(Error::SignalingError(
                "negotiation worker died during startup".to_string(),
            )),
        }
    }

    /// Apply an offer for `session_id`, blocking the caller until the step
    /// completed so the answer is sent before the handler continues
    pub async fn offer(&self, session_id: &str, sdp: String, sdp_type: String) -> Result<String> {
        let (reply, response) = oneshot::channel();
        self.submit(Command::Offer {
            session_id: session_id.to_string(),
            sdp,
            sdp_type,
            reply,
        })?;
        response
            .await
            .map_err(|_| Error::SignalingError("negotiation step dropped".to_string()))?
    }

    /// Feed a trickled ICE candidate; does not wait for the step
    pub fn ice_candidate(
        &self,
        session_id: &str,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) {
        let _ = self.submit(Command::IceCandidate {
            session_id: session_id.to_string(),
            candidate,
            sdp_mid,
            sdp_mline_index,
        });
    }

    /// Select the video path subsequent offers attach. The write happens on
    /// the scheduler thread; the caller waits for it to land.
    pub async fn select_video(&self, path: std::path::PathBuf) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.submit(Command::SelectVideo { path, reply })?;
        response
            .await
            .map_err(|_| Error::SignalingError("negotiation step dropped".to_string()))
    }

    /// Tear down `session_id`, blocking until the close step completed so no
    /// frame callback can fire after this returns. No-op for unknown ids.
    pub async fn teardown(&self, session_id: &str) {
        let (reply, response) = oneshot::channel();
        if self
            .submit(Command::Teardown {
                session_id: session_id.to_string(),
                reply,
            })
            .is_ok()
        {
            let _ = response.await;
        }
    }

    fn submit(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::SignalingError("negotiation worker unavailable".to_string()))
    }
}

impl Drop for NegotiationBridge {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Scheduler loop: one command at a time, in arrival order
async fn run_scheduler(
    mut rx: mpsc::UnboundedReceiver<Command>,
    registry: Arc<SessionRegistry>,
    selected: SelectedVideo,
    config: Arc<ServerConfig>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Offer {
                session_id,
                sdp,
                sdp_type,
                reply,
            } => {
                let result = handle_offer(&registry, &selected, &config, &session_id, sdp, sdp_type)
                    .await;
                if let Err(e) = &result {
                    error!(session_id = %session_id, error = %e, "offer handling failed; session closed");
                }
                let _ = reply.send(result);
            }
            Command::IceCandidate {
                session_id,
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                handle_ice_candidate(&registry, &session_id, candidate, sdp_mid, sdp_mline_index)
                    .await;
            }
            Command::SelectVideo { path, reply } => {
                selected.set(path);
                let _ = reply.send(());
            }
            Command::Teardown { session_id, reply } => {
                if let Some(session) = registry.remove(&session_id) {
                    session.teardown().await;
                    info!(session_id = %session_id, "session cleaned up");
                }
                let _ = reply.send(());
            }
            Command::Shutdown => break,
        }
    }

    // Drain remaining sessions so engine resources are released with the
    // scheduler still alive.
    for id in registry.ids() {
        if let Some(session) = registry.remove(&id) {
            session.teardown().await;
        }
    }
}

/// Offer step: tear down any prior session for the id, build a fresh
/// connection, attach outbound media when a video is selected, and drive
/// the state machine through `HaveRemoteOffer` to `HaveLocalAnswer`
async fn handle_offer(
    registry: &Arc<SessionRegistry>,
    selected: &SelectedVideo,
    config: &Arc<ServerConfig>,
    session_id: &str,
    sdp: String,
    sdp_type: String,
) -> Result<String> {
    // Last writer wins: a repeat offer replaces the previous session
    // whether or not its negotiation finished.
    if let Some(previous) = registry.remove(session_id) {
        info!(session_id, "replacing existing session for repeat offer");
        previous.teardown().await;
    }

    if sdp_type != "offer" {
        return Err(Error::SdpError(format!(
            "expected description of type \"offer\", got \"{}\"",
            sdp_type
        )));
    }

    if registry.len() as u32 >= config.max_sessions {
        return Err(Error::SessionLimit(format!(
            "{} concurrent sessions",
            config.max_sessions
        )));
    }

    let connection = PeerConnection::new(session_id, config).await?;
    let session = PeerSession::new(session_id.to_string(), connection);

    match negotiate(&session, selected, config, sdp).await {
        Ok(answer) => {
            registry.insert(Arc::clone(&session));
            Ok(answer)
        }
        Err(e) => {
            // A half-negotiated connection cannot be trusted; force Closed.
            session.teardown().await;
            Err(e)
        }
    }
}

async fn negotiate(
    session: &Arc<PeerSession>,
    selected: &SelectedVideo,
    config: &Arc<ServerConfig>,
    sdp: String,
) -> Result<String> {
    match selected.get() {
        Some(path) => {
            let source = Arc::new(VideoFrameSource::new(path, true));
            let track = session.connection().add_video_track().await?;
            let pump = pump::spawn(Arc::clone(&source), track);
            session.attach_media(source, pump);
        }
        None => {
            warn!(session_id = %session.id(), "no video selected; answering without outbound media");
        }
    }

    session.connection().apply_remote_offer(sdp).await?;
    session.set_state(SessionState::HaveRemoteOffer);

    let answer = session
        .connection()
        .create_local_answer(config.ice_gather_timeout())
        .await?;
    session.set_state(SessionState::HaveLocalAnswer);

    Ok(answer)
}

/// Candidate step: applied to the session's connection when one exists;
/// candidates for unknown ids are logged and discarded, not an error
async fn handle_ice_candidate(
    registry: &Arc<SessionRegistry>,
    session_id: &str,
    candidate: String,
    sdp_mid: Option<String>,
    sdp_mline_index: Option<u16>,
) {
    if candidate.is_empty() {
        debug!(session_id, "end-of-candidates marker; ignoring");
        return;
    }

    match registry.get(session_id) {
        Some(session) => {
            if let Err(e) = session
                .connection()
                .add_ice_candidate(candidate, sdp_mid, sdp_mline_index)
                .await
            {
                warn!(session_id, error = %e, "dropping unusable ICE candidate");
            } else {
                debug!(session_id, "ICE candidate applied");
            }
        }
        None => {
            warn!(session_id, "ICE candidate for unknown session; discarding");
        }
    }
}
