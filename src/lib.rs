//! # LAN A/V Streamer
//!
//! Low-latency video+audio streaming from one capture PC to one viewer PC
//! over UDP, with viewer-side recording to AVI/WAV.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SENDER PC                            │
//! │  ┌──────────┐                 ┌────────────┐                 │
//! │  │  Camera  │                 │ Microphone │                 │
//! │  └────┬─────┘                 └─────┬──────┘                 │
//! │       ▼                             ▼                        │
//! │  ┌──────────┐                 ┌────────────┐                 │
//! │  │  Resize  │                 │ Noise Gate │                 │
//! │  │  + JPEG  │                 │ + Peak Norm│                 │
//! │  └────┬─────┘                 └─────┬──────┘                 │
//! │       ▼                             ▼                        │
//! │  ┌──────────────────────────────────────────┐                │
//! │  │   Frame Codec: ['V'|'A'][u64 len][data]  │                │
//! │  └────────────────────┬─────────────────────┘                │
//! │                       ▼                                      │
//! │           UDP fan-out to registered viewers                  │
//! └───────────────────────┼──────────────────────────────────────┘
//!                         │ one datagram = one frame
//! ┌───────────────────────┼──────────────────────────────────────┐
//! │                       ▼      RECEIVER PC                     │
//! │  ┌──────────────────────────────────────────┐                │
//! │  │   Frame Codec: decode, Invalid => loss   │                │
//! │  └───────┬─────────────────────────┬────────┘                │
//! │          ▼ VIDEO                   ▼ AUDIO                   │
//! │  ┌──────────────┐          ┌───────────────┐                 │
//! │  │ JPEG decode  │          │ PCM playback  │                 │
//! │  │ + stats      │          │ (arrival      │                 │
//! │  │   overlay    │          │  order)       │                 │
//! │  └──┬────────┬──┘          └──────┬────────┘                 │
//! │     ▼        ▼                    ▼                          │
//! │  Display  AVI recorder     WAV recording buffer              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport is best-effort: datagrams may be lost, truncated, or
//! reordered. Truncated datagrams are counted as losses; everything else
//! is displayed/played strictly in arrival order.

pub mod audio;
pub mod config;
pub mod error;
pub mod net;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod stats;
pub mod video;

pub use error::{Error, Result};

/// Application-wide constants (reference deployment values)
pub mod constants {
    /// Streamed video width in pixels
    pub const VIDEO_WIDTH: u32 = 480;

    /// Streamed video height in pixels
    pub const VIDEO_HEIGHT: u32 = 320;

    /// JPEG quality for streamed frames (1-100)
    pub const JPEG_QUALITY: u8 = 50;

    /// Audio sample rate in Hz (mono i16)
    pub const SAMPLE_RATE: u32 = 16_000;

    /// Audio samples per transmitted chunk
    pub const CHUNK_SAMPLES: usize = 1024;

    /// Mean absolute amplitude at or below which a chunk is silence
    pub const NOISE_GATE_THRESHOLD: f32 = 500.0;

    /// Peak-normalization target, kept below i16::MAX for headroom
    pub const NORMALIZE_CEILING: i16 = 15_000;

    /// Well-known UDP port the sender listens on for handshakes
    pub const SERVER_PORT: u16 = 9999;

    /// Kernel receive buffer size (SO_RCVBUF) on both sockets
    pub const RECV_BUFFER_SIZE: usize = 65_536;

    /// Maximum datagram size accepted by the receiver
    pub const MAX_DATAGRAM_SIZE: usize = 65_536;

    /// Pacing sleep between sender iterations, in milliseconds
    pub const SEND_INTERVAL_MS: u64 = 20;

    /// Frame rate stamped into the recorded video file
    pub const RECORD_FPS: f64 = 20.0;

    /// Socket read timeout used to poll the cancellation flag, in milliseconds
    pub const POLL_TIMEOUT_MS: u64 = 200;
}
