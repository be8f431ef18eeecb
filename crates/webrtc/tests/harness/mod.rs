//! Shared helpers for integration tests

use std::fs;
use std::path::Path;

/// Initialize test logging once; honors RUST_LOG
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

/// Write a minimal IVF container: 32-byte DKIF header followed by
/// 12-byte-framed payloads.
pub fn write_test_ivf(path: &Path, frames: &[&[u8]], width: u16, height: u16, fps: u32) {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"DKIF");
    buf.extend_from_slice(&0u16.to_le_bytes()); // version
    buf.extend_from_slice(&32u16.to_le_bytes()); // header size
    buf.extend_from_slice(b"VP80");
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&fps.to_le_bytes()); // timebase denominator
    buf.extend_from_slice(&1u32.to_le_bytes()); // timebase numerator
    buf.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // unused
    for (i, frame) in frames.iter().enumerate() {
        buf.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(i as u64).to_le_bytes());
        buf.extend_from_slice(frame);
    }
    fs::write(path, buf).unwrap();
}

/// Produce a syntactically valid client offer through a real engine
/// connection. A data channel is enough to get a complete SDP.
pub async fn client_offer_sdp() -> String {
    use webrtc::api::APIBuilder;
    use webrtc::peer_connection::configuration::RTCConfiguration;

    let api = APIBuilder::new().build();
    let pc = api
        .new_peer_connection(RTCConfiguration::default())
        .await
        .unwrap();
    pc.create_data_channel("control", None).await.unwrap();
    let offer = pc.create_offer(None).await.unwrap();
    let sdp = offer.sdp.clone();
    pc.close().await.unwrap();
    sdp
}
