//! Media types and the file-backed video pipeline
//!
//! A session's outbound video flows: [`VideoFrameSource`] (loops a stored
//! IVF file) → [`pump`] (paces frames on the negotiation scheduler) → the
//! session's video track.

pub mod pump;
pub mod source;
pub mod store;

pub use source::VideoFrameSource;
pub use store::{SelectedVideo, VideoStore, VIDEO_EXTENSIONS};

use bytes::Bytes;

/// Width of the filler frame produced when the backing file is unreadable
pub const FILLER_WIDTH: u32 = 640;

/// Height of the filler frame produced when the backing file is unreadable
pub const FILLER_HEIGHT: u32 = 480;

/// Fallback frame pacing when the container timebase is unknown (30 fps)
pub const DEFAULT_FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

/// One video frame pulled from a frame source
///
/// Frames read from a stored file carry the file's encoded payload; filler
/// frames carry a black raster at the nominal resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame payload
    pub data: Bytes,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Whether this payload is a keyframe
    pub keyframe: bool,

    /// Whether this is a filler frame (backing file unreadable or exhausted)
    pub filler: bool,
}

impl VideoFrame {
    /// Frame read from the backing file
    pub fn encoded(data: Bytes, width: u32, height: u32, keyframe: bool) -> Self {
        Self {
            data,
            width,
            height,
            keyframe,
            filler: false,
        }
    }

    /// Black filler frame at the nominal resolution
    ///
    /// YUV420P black raster: luma plane at 16, both chroma planes at the
    /// 128 neutral point.
    pub fn filler() -> Self {
        let y_size = (FILLER_WIDTH * FILLER_HEIGHT) as usize;
        let uv_size = y_size / 4;

        let mut raster = Vec::with_capacity(y_size + uv_size * 2);
        raster.extend(std::iter::repeat(16u8).take(y_size));
        raster.extend(std::iter::repeat(128u8).take(uv_size * 2));

        Self {
            data: Bytes::from(raster),
            width: FILLER_WIDTH,
            height: FILLER_HEIGHT,
            keyframe: true,
            filler: true,
        }
    }

    /// Check whether this is a filler frame
    pub fn is_filler(&self) -> bool {
        self.filler
    }
}
