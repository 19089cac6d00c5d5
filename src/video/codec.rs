//! JPEG encode/decode for streamed frames
//!
//! Every video frame on the wire is one self-contained JPEG still,
//! decodable independently of all other frames. The sender normalizes to
//! a fixed resolution and a fixed, size-bounded quality before encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};

use crate::error::VideoError;
use crate::video::RawFrame;

/// Fixed-resolution, fixed-quality JPEG codec
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    width: u32,
    height: u32,
    quality: u8,
}

impl JpegCodec {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    /// Resize to the streaming resolution and JPEG-encode
    pub fn encode(&self, frame: &RawFrame) -> Result<Vec<u8>, VideoError> {
        let resized = if frame.dimensions() == (self.width, self.height) {
            frame.clone()
        } else {
            imageops::resize(frame, self.width, self.height, FilterType::Triangle)
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&resized)
            .map_err(|e| VideoError::EncodeFailed(e.to_string()))?;
        Ok(jpeg)
    }

    /// Decode a received JPEG payload into a raw frame
    ///
    /// Fails on corrupt or truncated images; the caller discards those
    /// and moves on.
    pub fn decode(data: &[u8]) -> Result<RawFrame, VideoError> {
        image::load_from_memory(data)
            .map(|img| img.to_rgb8())
            .map_err(|e| VideoError::DecodeFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_pattern(width: u32, height: u32) -> RawFrame {
        RawFrame::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_encode_resizes_to_stream_resolution() {
        let codec = JpegCodec::new(480, 320, 50);
        let frame = test_pattern(640, 480);

        let jpeg = codec.encode(&frame).unwrap();
        let decoded = JpegCodec::decode(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (480, 320));
    }

    #[test]
    fn test_roundtrip_at_native_resolution() {
        let codec = JpegCodec::new(64, 48, 90);
        let frame = test_pattern(64, 48);

        let jpeg = codec.encode(&frame).unwrap();
        assert!(!jpeg.is_empty());
        // SOI marker
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]);

        let decoded = JpegCodec::decode(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(JpegCodec::decode(b"not a jpeg").is_err());
        assert!(JpegCodec::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_jpeg() {
        let codec = JpegCodec::new(64, 48, 50);
        let jpeg = codec.encode(&test_pattern(64, 48)).unwrap();

        // Chop off most of the scan data
        assert!(JpegCodec::decode(&jpeg[..jpeg.len() / 4]).is_err());
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let frame = test_pattern(480, 320);
        let small = JpegCodec::new(480, 320, 20).encode(&frame).unwrap();
        let large = JpegCodec::new(480, 320, 95).encode(&frame).unwrap();
        assert!(small.len() < large.len());
    }
}
