//! Engine-level peer connection wrapper
//!
//! Wraps a `webrtc::RTCPeerConnection` with the handful of operations the
//! session layer needs: answer an offer, feed trickled candidates, attach
//! the outbound video track, close. All of these run on the negotiation
//! scheduler thread.

use crate::{Error, Result, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_VP8};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// One negotiation-engine connection, exclusively owned by its session
pub struct PeerConnection {
    /// Session this connection belongs to
    session_id: String,

    /// Underlying engine connection
    pc: Arc<RTCPeerConnection>,
}

impl PeerConnection {
    /// Create a new peer connection configured from the server's ICE servers
    pub async fn new(session_id: &str, config: &ServerConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::PeerConnectionError(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry = register_default_interceptors(Default::default(), &mut media_engine)
            .map_err(|e| {
                Error::PeerConnectionError(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        // An empty STUN list is allowed: gathering then produces host
        // candidates only.
        let ice_servers: Vec<RTCIceServer> = config
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await.map_err(|e| {
            Error::PeerConnectionError(format!("Failed to create peer connection: {}", e))
        })?);

        debug!(session_id, "created peer connection");

        Ok(Self {
            session_id: session_id.to_string(),
            pc,
        })
    }

    /// Session this connection belongs to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Register a callback invoked whenever the engine's connection state
    /// changes. Used by the session to observe the implicit transition to
    /// `Connected`.
    pub fn on_state_change<F>(&self, mut handler: F)
    where
        F: FnMut(RTCPeerConnectionState) + Send + Sync + 'static,
    {
        self.pc
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                handler(state);
                Box::pin(async {})
            }));
    }

    /// Attach the outbound VP8 video track
    pub async fn add_video_track(&self) -> Result<Arc<TrackLocalStaticSample>> {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
            format!("video-{}", self.session_id),
            format!("stream-{}", self.session_id),
        ));

        self.pc
            .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| Error::MediaTrackError(format!("Failed to add video track: {}", e)))?;

        debug!(session_id = %self.session_id, "video track attached");

        Ok(track)
    }

    /// Apply the client's offer as the remote description
    pub async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        let offer = RTCSessionDescription::offer(sdp)
            .map_err(|e| Error::SdpError(format!("Invalid offer SDP: {}", e)))?;

        self.pc
            .set_remote_description(offer)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set remote description: {}", e)))?;

        Ok(())
    }

    /// Generate and apply the local answer, waiting (bounded) for ICE
    /// gathering so the returned SDP is self-contained
    pub async fn create_local_answer(&self, gather_timeout: Duration) -> Result<String> {
        let mut gather_complete = self.pc.gathering_complete_promise().await;

        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to create answer: {}", e)))?;

        self.pc
            .set_local_description(answer)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set local description: {}", e)))?;

        // Candidates missed by the timeout would have to trickle; the
        // signaling contract has no outbound candidate message, so the
        // answer ships with whatever was gathered.
        if tokio::time::timeout(gather_timeout, gather_complete.recv())
            .await
            .is_err()
        {
            warn!(session_id = %self.session_id, "ICE gathering timed out; sending partial answer");
        }

        let local = self.pc.local_description().await.ok_or_else(|| {
            Error::SdpError("No local description after setting answer".to_string())
        })?;

        info!(session_id = %self.session_id, "generated SDP answer");

        Ok(local.sdp)
    }

    /// Feed one trickled ICE candidate to the connection
    pub async fn add_ice_candidate(
        &self,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate,
            sdp_mid,
            sdp_mline_index,
            ..Default::default()
        };

        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| Error::IceCandidateError(format!("Failed to add ICE candidate: {}", e)))?;

        Ok(())
    }

    /// Close the connection. A closed connection is never reused.
    pub async fn close(&self) -> Result<()> {
        self.pc
            .close()
            .await
            .map_err(|e| Error::PeerConnectionError(format!("Failed to close connection: {}", e)))?;

        debug!(session_id = %self.session_id, "peer connection closed");

        Ok(())
    }
}
