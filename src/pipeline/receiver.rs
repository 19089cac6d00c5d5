//! Playback pipeline: receive -> decode -> play/record
//!
//! One blocking receive per iteration. Invalid datagrams count as losses,
//! malformed JPEGs are discarded, audio plays in strict arrival order,
//! and everything that survives decoding is accumulated for the recording
//! finalizer. Finalization runs on every exit path, interrupt included.

use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::{bytes_to_samples, AudioSink, RecordingBuffer};
use crate::config::AppConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::{NetworkError, RecordError};
use crate::net;
use crate::protocol::{self, Decoded, FrameKind};
use crate::stats::StatsTracker;
use crate::video::{codec::JpegCodec, overlay, VideoDisplay, VideoRecorder};

/// Outcome of handling one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverStep {
    /// Valid video frame displayed and recorded
    Video,
    /// Valid audio chunk played and buffered
    Audio,
    /// Invalid datagram, counted as a loss
    Loss,
    /// Valid frame whose image payload failed to decode; discarded
    SkippedDecode,
}

/// What the finalizer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedRecordings {
    /// Recorded video file, if any frame was written
    pub video: Option<PathBuf>,
    /// Recorded audio file, if any chunk was buffered
    pub audio: Option<PathBuf>,
}

/// Viewer-side pipeline
pub struct ReceiverPipeline<D: VideoDisplay, S: AudioSink, R: VideoRecorder> {
    socket: UdpSocket,
    stats: StatsTracker,
    display: D,
    sink: S,
    recorder: R,
    audio_buffer: RecordingBuffer,
    audio_path: PathBuf,
    sample_rate: u32,
    playback_calls: u64,
    finalized: bool,
}

impl<D: VideoDisplay, S: AudioSink, R: VideoRecorder> ReceiverPipeline<D, S, R> {
    pub fn new(
        socket: UdpSocket,
        display: D,
        sink: S,
        recorder: R,
        audio_path: PathBuf,
        config: &AppConfig,
    ) -> Self {
        Self {
            socket,
            stats: StatsTracker::new(),
            display,
            sink,
            recorder,
            audio_buffer: RecordingBuffer::new(),
            audio_path,
            sample_rate: config.audio.sample_rate,
            playback_calls: 0,
            finalized: false,
        }
    }

    /// Send the handshake datagram to the sender
    pub fn handshake(&self, server: SocketAddr) -> Result<(), NetworkError> {
        self.socket
            .send_to(b"hello", server)
            .map_err(|e| NetworkError::SendFailed(e.to_string()))?;
        tracing::info!("handshake sent to {}, waiting for stream...", server);
        Ok(())
    }

    /// Process one received datagram
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> ReceiverStep {
        let frame = match protocol::decode(datagram) {
            Decoded::Frame(frame) => frame,
            Decoded::Invalid => {
                self.stats.record_loss();
                return ReceiverStep::Loss;
            }
        };

        self.stats.record_bytes(datagram.len());

        match frame.kind {
            FrameKind::Video => self.handle_video(&frame.payload),
            FrameKind::Audio => self.handle_audio(&frame.payload),
        }
    }

    fn handle_video(&mut self, payload: &[u8]) -> ReceiverStep {
        self.stats.record_frame();
        self.stats.tick();

        let mut image = match JpegCodec::decode(payload) {
            Ok(image) => image,
            Err(e) => {
                // Corrupt image inside a well-formed datagram: discard,
                // do not count toward the recording
                tracing::warn!("video frame undecodable, discarding: {}", e);
                return ReceiverStep::SkippedDecode;
            }
        };

        // Overlay goes on before display AND before the recorder write,
        // so the recording carries it too
        if let Some(snapshot) = self.stats.snapshot() {
            overlay::draw_overlay(&mut image, snapshot);
        }

        if let Err(e) = self.display.show(&image) {
            tracing::warn!("display failed: {}", e);
        }
        if let Err(e) = self.recorder.record(&image) {
            tracing::warn!("video recorder write failed: {}", e);
        }

        ReceiverStep::Video
    }

    fn handle_audio(&mut self, payload: &[u8]) -> ReceiverStep {
        let samples = bytes_to_samples(payload);

        self.playback_calls += 1;
        if let Err(e) = self.sink.play(&samples) {
            tracing::warn!("audio playback failed: {}", e);
        }
        // Recorded regardless of playback health; the file should hold
        // everything that arrived
        self.audio_buffer.append(&samples);

        ReceiverStep::Audio
    }

    /// Run until cancelled, then finalize recordings
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<FinalizedRecordings, NetworkError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        while !cancel.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((n, _)) => {
                    self.handle_datagram(&buf[..n]);
                }
                Err(e) if net::is_timeout(&e) => continue,
                Err(e) => {
                    tracing::warn!("receive failed: {}", e);
                }
            }
        }

        self.finalize()
            .map_err(|e| NetworkError::ReceiveFailed(format!("finalization failed: {}", e)))
    }

    /// Flush recordings to disk; single-shot
    ///
    /// Runs on every exit path. A second call is a no-op reporting
    /// nothing new.
    pub fn finalize(&mut self) -> Result<FinalizedRecordings, RecordError> {
        if self.finalized {
            return Ok(FinalizedRecordings {
                video: None,
                audio: None,
            });
        }
        self.finalized = true;

        tracing::info!("stopping and saving recordings...");

        let video = self.recorder.finish()?;
        match &video {
            Some(path) => tracing::info!("saved video: {}", path.display()),
            None => tracing::info!("no video recorded"),
        }

        let buffer = std::mem::take(&mut self.audio_buffer);
        let audio = buffer.finalize_wav(&self.audio_path, self.sample_rate)?;
        match &audio {
            Some(path) => tracing::info!("saved audio: {}", path.display()),
            None => tracing::info!("no audio recorded"),
        }

        Ok(FinalizedRecordings { video, audio })
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Audio chunks buffered for the recording so far
    pub fn buffered_chunks(&self) -> usize {
        self.audio_buffer.len()
    }

    /// Times the audio sink was invoked
    pub fn playback_calls(&self) -> u64 {
        self.playback_calls
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{samples_to_bytes, AudioSink};
    use crate::error::AudioError;
    use crate::net::bind_ephemeral;
    use crate::video::{RawFrame, SoftwareDisplay, VideoRecorder};
    use image::Rgb;

    #[derive(Default)]
    struct CountingSink {
        calls: u64,
        samples_seen: usize,
    }

    impl AudioSink for CountingSink {
        fn play(&mut self, samples: &[i16]) -> Result<(), AudioError> {
            self.calls += 1;
            self.samples_seen += samples.len();
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRecorder {
        writes: u64,
        finished: bool,
    }

    impl VideoRecorder for CountingRecorder {
        fn record(&mut self, _frame: &RawFrame) -> Result<(), RecordError> {
            if self.finished {
                return Err(RecordError::AlreadyFinalized);
            }
            self.writes += 1;
            Ok(())
        }

        fn frames_written(&self) -> u64 {
            self.writes
        }

        fn finish(&mut self) -> Result<Option<PathBuf>, RecordError> {
            self.finished = true;
            if self.writes > 0 {
                Ok(Some(PathBuf::from("counted.avi")))
            } else {
                Ok(None)
            }
        }
    }

    fn test_pipeline(
        audio_path: PathBuf,
    ) -> ReceiverPipeline<SoftwareDisplay, CountingSink, CountingRecorder> {
        let socket = bind_ephemeral().unwrap();
        let config = AppConfig::default();
        ReceiverPipeline::new(
            socket,
            SoftwareDisplay::new(),
            CountingSink::default(),
            CountingRecorder::default(),
            audio_path,
            &config,
        )
    }

    fn video_datagram() -> Vec<u8> {
        let frame = RawFrame::from_pixel(64, 48, Rgb([200, 100, 50]));
        let jpeg = JpegCodec::new(64, 48, 50).encode(&frame).unwrap();
        protocol::encode(FrameKind::Video, &jpeg).to_vec()
    }

    fn audio_datagram(samples: &[i16]) -> Vec<u8> {
        protocol::encode(FrameKind::Audio, &samples_to_bytes(samples)).to_vec()
    }

    fn truncated_datagram() -> Vec<u8> {
        let mut datagram = audio_datagram(&[500i16; 64]);
        datagram.truncate(datagram.len() - 10);
        datagram
    }

    #[test]
    fn test_hundred_clean_video_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));
        let datagram = video_datagram();

        for _ in 0..100 {
            assert_eq!(pipeline.handle_datagram(&datagram), ReceiverStep::Video);
        }

        assert_eq!(pipeline.recorder.frames_written(), 100);
        assert_eq!(pipeline.display.rendered(), 100);
        assert_eq!(pipeline.stats().frames_in_window(), 100);
        assert_eq!(pipeline.stats().losses_in_window(), 0);
    }

    #[test]
    fn test_audio_interleaved_with_truncated_datagrams() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));

        let good = audio_datagram(&[1000i16; 128]);
        let bad = truncated_datagram();

        // 10 good audio frames with 5 truncated datagrams mixed in
        for i in 0..15 {
            if i % 3 == 2 {
                assert_eq!(pipeline.handle_datagram(&bad), ReceiverStep::Loss);
            } else {
                assert_eq!(pipeline.handle_datagram(&good), ReceiverStep::Audio);
            }
        }

        assert_eq!(pipeline.playback_calls(), 10);
        assert_eq!(pipeline.sink.calls, 10);
        assert_eq!(pipeline.buffered_chunks(), 10);
        assert_eq!(pipeline.stats().losses_in_window(), 5);
    }

    #[test]
    fn test_undersized_datagram_counts_one_loss() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));

        for len in 0..9usize {
            let before = pipeline.stats().losses_in_window();
            assert_eq!(
                pipeline.handle_datagram(&vec![b'V'; len]),
                ReceiverStep::Loss
            );
            assert_eq!(pipeline.stats().losses_in_window(), before + 1);
        }
    }

    #[test]
    fn test_corrupt_jpeg_discarded_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));

        // Well-formed datagram, garbage image payload
        let datagram = protocol::encode(FrameKind::Video, b"definitely not a jpeg");
        assert_eq!(
            pipeline.handle_datagram(&datagram),
            ReceiverStep::SkippedDecode
        );

        assert_eq!(pipeline.recorder.frames_written(), 0);
        assert_eq!(pipeline.display.rendered(), 0);
        // Still counted as a received frame, not as a loss
        assert_eq!(pipeline.stats().frames_in_window(), 1);
        assert_eq!(pipeline.stats().losses_in_window(), 0);
    }

    #[test]
    fn test_finalize_with_no_audio_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("audio.wav");
        let mut pipeline = test_pipeline(audio_path.clone());

        pipeline.handle_datagram(&video_datagram());
        let finalized = pipeline.finalize().unwrap();

        assert!(finalized.video.is_some());
        assert!(finalized.audio.is_none());
        assert!(!audio_path.exists());
    }

    #[test]
    fn test_finalize_writes_wav_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("audio.wav");
        let mut pipeline = test_pipeline(audio_path.clone());

        pipeline.handle_datagram(&audio_datagram(&[1, 2, 3]));
        pipeline.handle_datagram(&audio_datagram(&[4, 5, 6]));

        let finalized = pipeline.finalize().unwrap();
        assert_eq!(finalized.audio, Some(audio_path.clone()));

        let mut reader = hound::WavReader::open(&audio_path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_finalize_is_single_shot() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));

        pipeline.handle_datagram(&audio_datagram(&[9, 9]));
        let first = pipeline.finalize().unwrap();
        assert!(first.audio.is_some());

        let second = pipeline.finalize().unwrap();
        assert!(second.audio.is_none());
        assert!(second.video.is_none());
    }

    #[test]
    fn test_overlay_baked_in_after_first_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = test_pipeline(dir.path().join("audio.wav"));
        let datagram = video_datagram();

        // Before any snapshot exists nothing is drawn: the displayed
        // frame equals the decoded one
        pipeline.handle_datagram(&datagram);
        let plain = pipeline.display.last_frame().unwrap().clone();

        // Force a published snapshot, then feed another frame
        std::thread::sleep(std::time::Duration::from_millis(1100));
        pipeline.handle_datagram(&datagram);
        let overlaid = pipeline.display.last_frame().unwrap().clone();

        assert_ne!(plain.as_raw(), overlaid.as_raw());
    }
}
