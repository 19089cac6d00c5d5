//! Error types for the streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Recording error: {0}")]
    Record(#[from] RecordError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Video subsystem errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Camera not found: {0}")]
    CameraNotFound(String),

    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    #[error("JPEG encoding failed: {0}")]
    EncodeFailed(String),

    #[error("JPEG decoding failed: {0}")]
    DecodeFailed(String),

    #[error("Display failed: {0}")]
    DisplayFailed(String),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Chunk read failed: {0}")]
    ReadFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Recording errors
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Video file write failed: {0}")]
    VideoWrite(String),

    #[error("Audio file write failed: {0}")]
    AudioWrite(String),

    #[error("Recorder already finalized")]
    AlreadyFinalized,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
