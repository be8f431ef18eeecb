//! Signaling message contract
//!
//! JSON over the signaling channel, one object per text frame, tagged by an
//! `event` field. The SDP payloads keep their own `type` field (`offer` /
//! `answer`) alongside the tag, matching what browser RTC clients emit.

use serde::{Deserialize, Serialize};

/// Messages a client sends to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// SDP offer; drives the session to `HaveLocalAnswer`
    Offer {
        sdp: String,
        #[serde(rename = "type")]
        sdp_type: String,
    },
    /// Trickled ICE candidate
    IceCandidate {
        candidate: String,
        #[serde(default)]
        sdp_mid: Option<String>,
        #[serde(default)]
        sdp_mline_index: Option<u16>,
    },
    /// Select the stored video served to subsequent offers
    StartStream { video_filename: String },
    /// Tear down the caller's session
    StopStream,
    /// List recognized video assets
    GetVideos,
}

/// Messages the server sends to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent on accept; carries the assigned session id
    Connected { session_id: String },
    /// SDP answer, sent to the originating client only
    Answer {
        sdp: String,
        #[serde(rename = "type")]
        sdp_type: String,
    },
    /// Acknowledges `start_stream`
    StreamStarted { video_filename: String },
    /// Acknowledges `stop_stream`
    StreamStopped,
    /// Response to `get_videos`
    VideosList { videos: Vec<String> },
    /// Non-fatal failure report; the channel stays open
    Error { message: String },
}

impl ServerMessage {
    /// Build an `error` message
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Build an `answer` message
    pub fn answer(sdp: String) -> Self {
        Self::Answer {
            sdp,
            sdp_type: "answer".to_string(),
        }
    }
}
