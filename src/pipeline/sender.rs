//! Capture pipeline: grab -> encode -> frame -> fan-out
//!
//! Each iteration sends at most one video frame and one audio chunk to
//! every registered viewer, then sleeps a fixed interval to bound the
//! send rate. A failed grab skips the iteration; a failed send to one
//! endpoint does not abort the others; a silent audio chunk is simply
//! not transmitted.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::audio::{samples_to_bytes, AudioSource, GateDecision, NoiseGate};
use crate::config::AppConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::NetworkError;
use crate::net;
use crate::protocol::{self, Decoded, FrameKind};
use crate::session::SessionRegistry;
use crate::video::{JpegCodec, VideoSource};

/// Audio half of one iteration's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStep {
    /// Voiced chunk transmitted
    Sent,
    /// Chunk suppressed by the noise gate
    Gated,
    /// No complete chunk was ready this iteration
    NotReady,
    /// Transient device fault, logged and skipped
    Skipped,
}

/// Outcome of one sender iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderStep {
    /// Video frame transmitted; audio outcome attached
    Sent { audio: AudioStep },
    /// Frame acquisition failed; the whole iteration was skipped
    Skipped,
}

/// Capture-side pipeline
pub struct SenderPipeline<V: VideoSource, A: AudioSource> {
    socket: UdpSocket,
    registry: SessionRegistry,
    video: V,
    audio: A,
    jpeg: JpegCodec,
    gate: NoiseGate,
    send_interval: Duration,
    frames_sent: u64,
    chunks_sent: u64,
    chunks_gated: u64,
}

impl<V: VideoSource, A: AudioSource> SenderPipeline<V, A> {
    pub fn new(socket: UdpSocket, video: V, audio: A, config: &AppConfig) -> Self {
        Self {
            socket,
            registry: SessionRegistry::new(),
            video,
            audio,
            jpeg: JpegCodec::new(
                config.video.width,
                config.video.height,
                config.video.jpeg_quality,
            ),
            gate: NoiseGate::new(
                config.audio.gate_threshold,
                config.audio.normalize_ceiling,
            ),
            send_interval: Duration::from_millis(config.network.send_interval_ms),
            frames_sent: 0,
            chunks_sent: 0,
            chunks_gated: 0,
        }
    }

    /// Block until the first viewer handshake arrives
    ///
    /// Returns false when cancelled before any viewer showed up. The
    /// socket's poll timeout keeps the wait responsive to the flag.
    pub fn wait_for_handshake(&mut self, cancel: &AtomicBool) -> Result<bool, NetworkError> {
        let mut buf = [0u8; 1024];
        tracing::info!("waiting for viewer handshake...");

        while !cancel.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((n, addr)) => {
                    if self.try_register(&buf[..n], addr) {
                        return Ok(true);
                    }
                }
                Err(e) if net::is_timeout(&e) => continue,
                Err(e) => return Err(NetworkError::ReceiveFailed(e.to_string())),
            }
        }
        Ok(false)
    }

    /// Drain any pending datagrams without blocking, registering new
    /// viewers
    fn poll_handshakes(&mut self) {
        let mut buf = [0u8; 1024];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((n, addr)) => {
                    self.try_register(&buf[..n], addr);
                }
                Err(e) if net::is_timeout(&e) => break,
                Err(e) => {
                    tracing::warn!("handshake poll failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Anything that is not a media frame counts as a handshake
    fn try_register(&mut self, datagram: &[u8], addr: std::net::SocketAddr) -> bool {
        if let Decoded::Frame(_) = protocol::decode(datagram) {
            return false;
        }
        if self.registry.register_if_new(addr) {
            tracing::info!("viewer connected: {}", addr);
        }
        true
    }

    /// Run one iteration: video first, then gated audio
    pub fn step(&mut self) -> SenderStep {
        let frame = match self.video.grab() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("frame grab failed, skipping iteration: {}", e);
                return SenderStep::Skipped;
            }
        };

        match self.jpeg.encode(&frame) {
            Ok(jpeg) => {
                self.fan_out(FrameKind::Video, &jpeg);
                self.frames_sent += 1;
            }
            Err(e) => {
                tracing::warn!("jpeg encode failed, skipping iteration: {}", e);
                return SenderStep::Skipped;
            }
        }

        let audio = self.audio_step();
        SenderStep::Sent { audio }
    }

    fn audio_step(&mut self) -> AudioStep {
        let chunk = match self.audio.next_chunk() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return AudioStep::NotReady,
            Err(e) => {
                tracing::warn!("audio read failed, skipping chunk: {}", e);
                return AudioStep::Skipped;
            }
        };

        match self.gate.process(&chunk) {
            GateDecision::Silent => {
                self.chunks_gated += 1;
                AudioStep::Gated
            }
            GateDecision::Voiced(normalized) => {
                self.fan_out(FrameKind::Audio, &samples_to_bytes(&normalized));
                self.chunks_sent += 1;
                AudioStep::Sent
            }
        }
    }

    /// Transmit one frame to every registered viewer
    ///
    /// A send failure to one endpoint is logged and does not abort the
    /// rest of the fan-out.
    fn fan_out(&self, kind: FrameKind, payload: &[u8]) {
        let datagram = protocol::encode(kind, payload);
        if datagram.len() > MAX_DATAGRAM_SIZE {
            tracing::warn!(
                "{:?} frame of {} bytes exceeds the datagram ceiling, dropped",
                kind,
                datagram.len()
            );
            return;
        }
        for endpoint in self.registry.endpoints() {
            if let Err(e) = self.socket.send_to(&datagram, endpoint) {
                tracing::warn!("send to {} failed: {}", endpoint, e);
            }
        }
    }

    /// Run until cancelled
    ///
    /// Blocks for the first handshake, then paces iterations at the send
    /// interval. The camera, audio stream, and socket are released when
    /// the pipeline is dropped.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), NetworkError> {
        if !self.wait_for_handshake(cancel)? {
            tracing::info!("cancelled before any viewer connected");
            return Ok(());
        }

        // Handshakes are polled without blocking from here on
        self.socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))?;

        tracing::info!("streaming started (video + audio)");

        while !cancel.load(Ordering::Relaxed) {
            self.poll_handshakes();
            self.step();
            std::thread::sleep(self.send_interval);
        }

        tracing::info!(
            "streaming stopped: {} video frames, {} audio chunks sent, {} gated",
            self.frames_sent,
            self.chunks_sent,
            self.chunks_gated
        );
        Ok(())
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    pub fn chunks_gated(&self) -> u64 {
        self.chunks_gated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSource;
    use crate::error::{AudioError, VideoError};
    use crate::net::bind_ephemeral;
    use crate::video::{RawFrame, VideoSource};
    use image::Rgb;
    use std::sync::atomic::AtomicBool;

    struct FixedCamera;

    impl VideoSource for FixedCamera {
        fn grab(&mut self) -> Result<RawFrame, VideoError> {
            Ok(RawFrame::from_pixel(64, 48, Rgb([40, 80, 120])))
        }
    }

    struct FailingCamera;

    impl VideoSource for FailingCamera {
        fn grab(&mut self) -> Result<RawFrame, VideoError> {
            Err(VideoError::CaptureFailed("device busy".to_string()))
        }
    }

    struct ScriptedMic {
        chunks: Vec<Option<Vec<i16>>>,
    }

    impl AudioSource for ScriptedMic {
        fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError> {
            if self.chunks.is_empty() {
                return Ok(None);
            }
            Ok(self.chunks.remove(0))
        }
    }

    fn loud_chunk() -> Vec<i16> {
        vec![4000i16; 1024]
    }

    fn quiet_chunk() -> Vec<i16> {
        vec![10i16; 1024]
    }

    fn pipeline_with(
        audio: ScriptedMic,
    ) -> (SenderPipeline<FixedCamera, ScriptedMic>, UdpSocket) {
        let sender_socket = bind_ephemeral().unwrap();
        let viewer_socket = bind_ephemeral().unwrap();
        let config = AppConfig::default();
        let pipeline = SenderPipeline::new(sender_socket, FixedCamera, audio, &config);
        (pipeline, viewer_socket)
    }

    fn recv_kinds(viewer: &UdpSocket, expected: usize) -> Vec<FrameKind> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut kinds = Vec::new();
        for _ in 0..expected {
            let (n, _) = viewer.recv_from(&mut buf).unwrap();
            match protocol::decode(&buf[..n]) {
                Decoded::Frame(frame) => kinds.push(frame.kind),
                Decoded::Invalid => panic!("sender emitted an invalid datagram"),
            }
        }
        kinds
    }

    #[test]
    fn test_handshake_registers_exactly_one_endpoint() {
        let (mut pipeline, viewer) = pipeline_with(ScriptedMic { chunks: vec![] });
        let sender_addr = pipeline.socket.local_addr().unwrap();

        // 5-byte hello, twice from the same address
        viewer.send_to(b"hello", sender_addr).unwrap();
        viewer.send_to(b"hello", sender_addr).unwrap();

        let cancel = AtomicBool::new(false);
        assert!(pipeline.wait_for_handshake(&cancel).unwrap());
        pipeline.socket.set_nonblocking(true).unwrap();
        pipeline.poll_handshakes();

        assert_eq!(pipeline.registry().len(), 1);
        let registered: Vec<_> = pipeline.registry().endpoints().collect();
        assert_eq!(registered, vec![viewer.local_addr().unwrap()]);
    }

    #[test]
    fn test_step_sends_video_and_voiced_audio() {
        let (mut pipeline, viewer) = pipeline_with(ScriptedMic {
            chunks: vec![Some(loud_chunk())],
        });
        let sender_addr = pipeline.socket.local_addr().unwrap();
        viewer.send_to(b"hi", sender_addr).unwrap();

        let cancel = AtomicBool::new(false);
        pipeline.wait_for_handshake(&cancel).unwrap();

        let outcome = pipeline.step();
        assert_eq!(outcome, SenderStep::Sent { audio: AudioStep::Sent });

        let kinds = recv_kinds(&viewer, 2);
        assert_eq!(kinds, vec![FrameKind::Video, FrameKind::Audio]);
        assert_eq!(pipeline.frames_sent(), 1);
        assert_eq!(pipeline.chunks_sent(), 1);
    }

    #[test]
    fn test_silent_chunk_is_not_transmitted() {
        let (mut pipeline, viewer) = pipeline_with(ScriptedMic {
            chunks: vec![Some(quiet_chunk()), Some(loud_chunk())],
        });
        let sender_addr = pipeline.socket.local_addr().unwrap();
        viewer.send_to(b"hi", sender_addr).unwrap();

        let cancel = AtomicBool::new(false);
        pipeline.wait_for_handshake(&cancel).unwrap();

        assert_eq!(pipeline.step(), SenderStep::Sent { audio: AudioStep::Gated });
        assert_eq!(pipeline.step(), SenderStep::Sent { audio: AudioStep::Sent });
        assert_eq!(pipeline.chunks_gated(), 1);
        assert_eq!(pipeline.chunks_sent(), 1);

        // Only video, video, audio ever hit the wire
        let kinds = recv_kinds(&viewer, 3);
        assert_eq!(kinds, vec![FrameKind::Video, FrameKind::Video, FrameKind::Audio]);
    }

    #[test]
    fn test_normalized_audio_respects_ceiling() {
        let (mut pipeline, viewer) = pipeline_with(ScriptedMic {
            chunks: vec![Some(loud_chunk())],
        });
        let sender_addr = pipeline.socket.local_addr().unwrap();
        viewer.send_to(b"hi", sender_addr).unwrap();

        let cancel = AtomicBool::new(false);
        pipeline.wait_for_handshake(&cancel).unwrap();
        pipeline.step();

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        // skip the video frame
        viewer.recv_from(&mut buf).unwrap();
        let (n, _) = viewer.recv_from(&mut buf).unwrap();
        let Decoded::Frame(frame) = protocol::decode(&buf[..n]) else {
            panic!("invalid audio datagram");
        };
        let samples = crate::audio::bytes_to_samples(&frame.payload);
        assert_eq!(samples.len(), 1024);
        let peak = samples.iter().map(|s| (*s as i32).abs()).max().unwrap();
        assert_eq!(peak, crate::constants::NORMALIZE_CEILING as i32);
    }

    #[test]
    fn test_failed_grab_skips_iteration() {
        let sender_socket = bind_ephemeral().unwrap();
        let viewer = bind_ephemeral().unwrap();
        let config = AppConfig::default();
        let mut pipeline = SenderPipeline::new(
            sender_socket,
            FailingCamera,
            ScriptedMic {
                chunks: vec![Some(loud_chunk())],
            },
            &config,
        );
        let sender_addr = pipeline.socket.local_addr().unwrap();
        viewer.send_to(b"hi", sender_addr).unwrap();
        let cancel = AtomicBool::new(false);
        pipeline.wait_for_handshake(&cancel).unwrap();

        assert_eq!(pipeline.step(), SenderStep::Skipped);
        assert_eq!(pipeline.frames_sent(), 0);
        // Audio is not attempted when the video grab fails
        assert_eq!(pipeline.chunks_sent(), 0);
    }

    #[test]
    fn test_cancel_before_handshake() {
        let (mut pipeline, _viewer) = pipeline_with(ScriptedMic { chunks: vec![] });
        let cancel = AtomicBool::new(true);
        assert!(!pipeline.wait_for_handshake(&cancel).unwrap());
        assert!(pipeline.registry().is_empty());
    }
}
