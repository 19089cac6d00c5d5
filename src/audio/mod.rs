//! Audio subsystem module
//!
//! All audio in the system is mono signed 16-bit PCM at a fixed sample
//! rate, moved around in fixed-size chunks. The capture and playback
//! devices are collaborators behind the [`AudioSource`] / [`AudioSink`]
//! seams; the pipelines only see chunks of samples.

pub mod buffer;
pub mod capture;
pub mod gate;
pub mod playback;
pub mod recording;

pub use buffer::{create_shared_queue, ChunkQueue, SharedChunkQueue};
pub use capture::MicSource;
pub use gate::{GateDecision, NoiseGate};
pub use playback::SpeakerSink;
pub use recording::RecordingBuffer;

use crate::error::AudioError;

/// Produces one chunk of raw mono i16 samples per call
pub trait AudioSource {
    /// Fetch the next captured chunk
    ///
    /// `Ok(None)` means no full chunk is ready this iteration; an error is
    /// a transient device fault the caller logs and skips.
    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError>;
}

/// Plays raw mono i16 samples immediately, in arrival order
pub trait AudioSink {
    fn play(&mut self, samples: &[i16]) -> Result<(), AudioError>;
}

/// Serialize samples as little-endian bytes for the wire
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Deserialize little-endian wire bytes into samples
///
/// A trailing odd byte cannot form a sample and is dropped.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_byte_roundtrip() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN, 12345, -12345];
        let bytes = samples_to_bytes(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(bytes_to_samples(&bytes), samples);
    }

    #[test]
    fn test_odd_trailing_byte_dropped() {
        let mut bytes = samples_to_bytes(&[100, 200]);
        bytes.push(0x7f);
        assert_eq!(bytes_to_samples(&bytes), vec![100, 200]);
    }
}
