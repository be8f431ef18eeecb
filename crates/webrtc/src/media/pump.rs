//! Per-session frame pump
//!
//! Paces frames from a [`VideoFrameSource`] onto the session's outbound
//! video track. Runs on the negotiation scheduler; the engine clock assigns
//! sample timing from the duration passed with each write, so the source
//! itself stays timestamp-free.

use super::VideoFrameSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Spawn the pacing task for one session
///
/// The task ticks at the source's nominal frame duration, pulls the next
/// frame, and writes it to the track as a timed sample. It ends when the
/// track rejects writes (connection closed) or when aborted by teardown;
/// teardown aborts the pump before stopping the source, so no write can
/// observe a released capture handle.
pub fn spawn(
    source: Arc<VideoFrameSource>,
    track: Arc<TrackLocalStaticSample>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(path = %source.path().display(), "frame pump started");

        loop {
            let frame = source.next_frame();
            let duration = source.nominal_frame_duration();

            let sample = Sample {
                data: frame.data,
                duration,
                ..Default::default()
            };

            if let Err(e) = track.write_sample(&sample).await {
                debug!(error = %e, "video track rejected sample; frame pump exiting");
                break;
            }

            trace!(filler = frame.filler, "frame written");
            tokio::time::sleep(duration).await;
        }
    })
}
