//! Video subsystem module
//!
//! Camera access, on-screen rendering, and the recording container are
//! external collaborators; the pipelines talk to them only through the
//! [`VideoSource`] / [`VideoDisplay`] / [`VideoRecorder`] seams. What the
//! core owns is the bytes: resize + JPEG on the way out, JPEG decode +
//! overlay on the way in.

pub mod capture;
pub mod codec;
pub mod overlay;
pub mod recorder;

pub use capture::CameraSource;
pub use codec::JpegCodec;
pub use recorder::AviRecorder;

use std::path::PathBuf;

use crate::error::{RecordError, VideoError};

/// Raw decoded frame: 8-bit RGB
pub type RawFrame = image::RgbImage;

/// Produces one raw frame per call (capture side)
pub trait VideoSource {
    /// Acquire the next frame
    ///
    /// An error is a transient acquisition fault; the caller logs it and
    /// skips the iteration.
    fn grab(&mut self) -> Result<RawFrame, VideoError>;
}

/// Presents decoded frames to the viewer (receive side)
pub trait VideoDisplay {
    fn show(&mut self, frame: &RawFrame) -> Result<(), VideoError>;
}

/// Accumulates decoded frames into a video file (receive side)
///
/// Implementations size themselves lazily from the first frame; the
/// protocol does not negotiate dimensions.
pub trait VideoRecorder {
    /// Append one frame to the recording
    fn record(&mut self, frame: &RawFrame) -> Result<(), RecordError>;

    /// Frames written so far
    fn frames_written(&self) -> u64;

    /// Close the recording
    ///
    /// Returns the produced file path, or `None` when no frame was ever
    /// written. Safe to call again after completion.
    fn finish(&mut self) -> Result<Option<PathBuf>, RecordError>;
}

/// Windowless display that keeps the latest frame
///
/// On-screen windowing is out of scope for the core; this renderer is
/// the software end of the seam and doubles as the test double.
#[derive(Debug, Default)]
pub struct SoftwareDisplay {
    last_frame: Option<RawFrame>,
    rendered: u64,
}

impl SoftwareDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently shown frame
    pub fn last_frame(&self) -> Option<&RawFrame> {
        self.last_frame.as_ref()
    }

    /// Number of frames shown
    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl VideoDisplay for SoftwareDisplay {
    fn show(&mut self, frame: &RawFrame) -> Result<(), VideoError> {
        self.last_frame = Some(frame.clone());
        self.rendered += 1;
        Ok(())
    }
}
