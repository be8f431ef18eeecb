//! Configuration for the media-session server

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration for the signaling server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the signaling server listens on
    pub listen_addr: String,

    /// Managed directory of stored video assets (created at startup if absent)
    pub video_dir: PathBuf,

    /// STUN server URLs. May be empty: the peer connection then gathers
    /// host candidates only, which is what the test suite relies on.
    pub stun_servers: Vec<String>,

    /// Maximum concurrent sessions (default: 32)
    pub max_sessions: u32,

    /// How long an answer waits for ICE gathering before being sent with
    /// whatever candidates have been collected so far, in seconds
    pub ice_gather_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5001".to_string(),
            video_dir: PathBuf::from("assets/videos"),
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            max_sessions: 32,
            ice_gather_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `listen_addr` is not a valid socket address
    /// - `max_sessions` is zero
    /// - `ice_gather_timeout_secs` is not in range 1-30
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "listen_addr must be a socket address, got {}",
                self.listen_addr
            )));
        }

        if self.max_sessions == 0 {
            return Err(Error::InvalidConfig(
                "max_sessions must be at least 1".to_string(),
            ));
        }

        if self.ice_gather_timeout_secs == 0 || self.ice_gather_timeout_secs > 30 {
            return Err(Error::InvalidConfig(format!(
                "ice_gather_timeout_secs must be in range 1-30, got {}",
                self.ice_gather_timeout_secs
            )));
        }

        Ok(())
    }

    /// ICE gathering timeout as a `Duration`
    pub fn ice_gather_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ice_gather_timeout_secs)
    }

    /// Set the video directory
    ///
    /// Useful for chaining from `Default::default()`.
    pub fn with_video_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.video_dir = dir.into();
        self
    }

    /// Set the listen address
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the STUN server list
    pub fn with_stun_servers(mut self, servers: Vec<String>) -> Self {
        self.stun_servers = servers;
        self
    }
}
