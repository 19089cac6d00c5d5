//! Audio recording buffer and WAV finalization
//!
//! Every chunk that reaches the receiver is appended here in arrival
//! order for the lifetime of the run, then drained exactly once into a
//! mono 16-bit WAV. An empty buffer produces no file at all; "no audio
//! recorded" is a normal outcome, not an error.

use std::path::{Path, PathBuf};

use chrono::Utc;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::RecordError;

/// Append-only accumulation of received audio chunks
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    chunks: Vec<Vec<i16>>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one received chunk
    pub fn append(&mut self, samples: &[i16]) {
        self.chunks.push(samples.to_vec());
    }

    /// Number of chunks buffered so far
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total buffered samples across all chunks
    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    /// Drain the buffer into a WAV file
    ///
    /// Consumes the buffer; chunks are concatenated in arrival order.
    /// Returns `Ok(None)` without creating a file when nothing was
    /// buffered.
    pub fn finalize_wav(
        self,
        path: &Path,
        sample_rate: u32,
    ) -> Result<Option<PathBuf>, RecordError> {
        if self.chunks.is_empty() {
            return Ok(None);
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer =
            WavWriter::create(path, spec).map_err(|e| RecordError::AudioWrite(e.to_string()))?;
        for chunk in &self.chunks {
            for &sample in chunk {
                writer
                    .write_sample(sample)
                    .map_err(|e| RecordError::AudioWrite(e.to_string()))?;
            }
        }
        writer
            .finalize()
            .map_err(|e| RecordError::AudioWrite(e.to_string()))?;

        Ok(Some(path.to_path_buf()))
    }
}

/// Timestamped output file name, e.g. `recorded_1712345678.avi`
pub fn timestamped_name(prefix: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, Utc::now().timestamp(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");

        let buffer = RecordingBuffer::new();
        let result = buffer.finalize_wav(&path, 16_000).unwrap();

        assert!(result.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_chunks_concatenated_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");

        let mut buffer = RecordingBuffer::new();
        buffer.append(&[1, 2, 3]);
        buffer.append(&[4, 5]);
        buffer.append(&[6]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_samples(), 6);

        let written = buffer.finalize_wav(&path, 16_000).unwrap().unwrap();
        assert_eq!(written, path);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_timestamped_name_shape() {
        let name = timestamped_name("audio", "wav");
        assert!(name.starts_with("audio_"));
        assert!(name.ends_with(".wav"));
    }
}
