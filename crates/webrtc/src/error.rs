//! Error types for the media-session layer

/// Result type alias using the media-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in media-session operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signaling channel error
    #[error("Signaling error: {0}")]
    SignalingError(String),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session limit reached
    #[error("Session limit reached: {0}")]
    SessionLimit(String),

    /// WebRTC peer connection error
    #[error("Peer connection error: {0}")]
    PeerConnectionError(String),

    /// ICE candidate error
    #[error("ICE candidate error: {0}")]
    IceCandidateError(String),

    /// SDP negotiation error
    #[error("SDP negotiation error: {0}")]
    SdpError(String),

    /// Media track error
    #[error("Media track error: {0}")]
    MediaTrackError(String),

    /// Requested video asset does not exist in the managed directory
    #[error("video file not found: {0}")]
    VideoNotFound(String),

    /// Invalid video filename (path traversal, separators)
    #[error("invalid video filename: {0}")]
    InvalidVideoName(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is a negotiation failure for one session
    /// (forces that session to `Closed`, never affects other sessions)
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Error::PeerConnectionError(_)
                | Error::IceCandidateError(_)
                | Error::SdpError(_)
                | Error::MediaTrackError(_)
        )
    }

    /// Check if this error is a client-side request error
    /// (bad filename, unknown asset) rather than a server fault
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::VideoNotFound(_) | Error::InvalidVideoName(_) | Error::SessionLimit(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("test".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: test");

        let err = Error::VideoNotFound("clip.mp4".to_string());
        assert_eq!(err.to_string(), "video file not found: clip.mp4");
    }

    #[test]
    fn test_error_is_session_error() {
        assert!(Error::SdpError("test".to_string()).is_session_error());
        assert!(Error::PeerConnectionError("test".to_string()).is_session_error());
        assert!(!Error::InvalidConfig("test".to_string()).is_session_error());
    }

    #[test]
    fn test_error_is_request_error() {
        assert!(Error::VideoNotFound("a.mp4".to_string()).is_request_error());
        assert!(!Error::SdpError("test".to_string()).is_request_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::IoError(_)));
    }
}
