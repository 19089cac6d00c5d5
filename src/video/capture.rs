//! Camera capture via nokhwa
//!
//! Fatal when the camera cannot be opened at startup; transient per-frame
//! failures surface as errors the pipeline logs and skips.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use crate::error::VideoError;
use crate::video::{RawFrame, VideoSource};

/// Camera-backed [`VideoSource`]
pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    /// Open camera `index` and start its stream
    pub fn open(index: u32) -> Result<Self, VideoError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| VideoError::CameraNotFound(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| VideoError::CameraNotFound(e.to_string()))?;

        tracing::info!(
            "camera {} open: {}x{}",
            index,
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(Self { camera })
    }
}

impl VideoSource for CameraSource {
    fn grab(&mut self) -> Result<RawFrame, VideoError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| VideoError::CaptureFailed(e.to_string()))?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| VideoError::CaptureFailed(e.to_string()))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}
