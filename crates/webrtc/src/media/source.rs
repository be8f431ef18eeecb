//! File-backed looping video frame source
//!
//! Reads pre-encoded frames out of an IVF container through the engine's
//! own reader. The source is an infinite sequence: end-of-file rewinds to
//! frame zero, and any failure to open or read the backing file degrades to
//! filler frames instead of surfacing an error to the session.

use super::{VideoFrame, DEFAULT_FRAME_DURATION};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use webrtc::media::io::ivf_reader::{IVFFileHeader, IVFReader};

/// Capture handle state
///
/// `Idle` before the first read; `Open` while the backing file is readable;
/// `Unreadable` once opening or rewinding has failed (every subsequent read
/// yields a filler frame); `Stopped` after [`VideoFrameSource::stop`].
enum CaptureState {
    Idle,
    Open(Capture),
    Unreadable,
    Stopped,
}

/// An open IVF capture: reader plus the container header it was opened with
struct Capture {
    reader: IVFReader<BufReader<File>>,
    header: IVFFileHeader,
}

impl Capture {
    fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let (reader, header) = IVFReader::new(BufReader::new(file))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(Self { reader, header })
    }

    /// Read the next frame, or `None` on end-of-stream / short read
    fn read_frame(&mut self) -> Option<VideoFrame> {
        let (payload, _frame_header) = self.reader.parse_next_frame().ok()?;
        let data = payload.freeze();
        // VP8 frame tag: low bit of the first payload byte is 0 for keyframes
        let keyframe = data.first().map(|b| b & 0x01 == 0).unwrap_or(false);
        Some(VideoFrame::encoded(
            data,
            self.header.width as u32,
            self.header.height as u32,
            keyframe,
        ))
    }

    /// Nominal frame duration from the container timebase
    fn frame_duration(&self) -> Duration {
        if self.header.timebase_denominator == 0 {
            return DEFAULT_FRAME_DURATION;
        }
        let millis =
            1000u64 * self.header.timebase_numerator as u64 / self.header.timebase_denominator as u64;
        if millis == 0 {
            DEFAULT_FRAME_DURATION
        } else {
            Duration::from_millis(millis)
        }
    }
}

/// Looping file-backed frame source for one session
///
/// `next_frame` and `stop` may run on different execution contexts; the
/// capture handle is guarded by a scoped lock so they never race on its
/// lifetime. Reads are plain buffered file I/O and return in bounded time.
pub struct VideoFrameSource {
    path: PathBuf,
    looping: bool,
    state: Mutex<CaptureState>,
}

impl VideoFrameSource {
    /// Create a source for `path`. The backing file is opened lazily on the
    /// first `next_frame` call.
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
            state: Mutex::new(CaptureState::Idle),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pull the next frame
    ///
    /// Never fails and never signals end-of-stream: on exhaustion the source
    /// rewinds to frame zero (when looping) and retries once; open or rewind
    /// failures degrade to filler frames at the nominal resolution.
    pub fn next_frame(&self) -> VideoFrame {
        let mut state = self.state.lock();

        match &mut *state {
            CaptureState::Stopped | CaptureState::Unreadable => VideoFrame::filler(),
            CaptureState::Idle => match Capture::open(&self.path) {
                Ok(mut capture) => {
                    info!(path = %self.path.display(), "opened video capture");
                    let frame = capture.read_frame();
                    *state = CaptureState::Open(capture);
                    match frame {
                        Some(frame) => frame,
                        None => self.rewind_and_read(&mut state),
                    }
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot open video capture; serving filler frames");
                    *state = CaptureState::Unreadable;
                    VideoFrame::filler()
                }
            },
            CaptureState::Open(capture) => match capture.read_frame() {
                Some(frame) => frame,
                None if self.looping => self.rewind_and_read(&mut state),
                None => VideoFrame::filler(),
            },
        }
    }

    /// Rewind to frame zero by reopening the backing file, then retry once.
    /// A second failure degrades the source to filler frames.
    fn rewind_and_read(&self, state: &mut CaptureState) -> VideoFrame {
        match Capture::open(&self.path) {
            Ok(mut capture) => {
                debug!(path = %self.path.display(), "capture exhausted; rewound to frame zero");
                let frame = capture.read_frame();
                match frame {
                    Some(frame) => {
                        *state = CaptureState::Open(capture);
                        frame
                    }
                    None => {
                        warn!(path = %self.path.display(), "no frames after rewind; serving filler frames");
                        *state = CaptureState::Unreadable;
                        VideoFrame::filler()
                    }
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "rewind failed; serving filler frames");
                *state = CaptureState::Unreadable;
                VideoFrame::filler()
            }
        }
    }

    /// Nominal frame duration for pacing, taken from the container timebase
    /// once the capture is open
    pub fn nominal_frame_duration(&self) -> Duration {
        match &*self.state.lock() {
            CaptureState::Open(capture) => capture.frame_duration(),
            _ => DEFAULT_FRAME_DURATION,
        }
    }

    /// Release the capture handle
    ///
    /// Idempotent, and safe even if `next_frame` was never called. Subsequent
    /// `next_frame` calls yield filler frames.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, CaptureState::Stopped) {
            debug!(path = %self.path.display(), "video capture stopped");
            *state = CaptureState::Stopped;
        }
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        matches!(*self.state.lock(), CaptureState::Stopped)
    }
}
