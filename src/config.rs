//! Application configuration
//!
//! Defaults reproduce the reference deployment constants; a TOML file in
//! the platform config directory can override them. Both binaries load
//! with [`AppConfig::load_or_default`].

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::Error;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub network: NetworkConfig,
    pub recording: RecordingConfig,
}

/// Video capture/encode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Streamed frame width in pixels
    pub width: u32,
    /// Streamed frame height in pixels
    pub height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: VIDEO_WIDTH,
            height: VIDEO_HEIGHT,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

/// Audio capture/gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz (mono i16 throughout)
    pub sample_rate: u32,
    /// Samples per transmitted chunk
    pub chunk_samples: usize,
    /// Noise gate threshold (mean absolute amplitude)
    pub gate_threshold: f32,
    /// Peak-normalization ceiling
    pub normalize_ceiling: i16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chunk_samples: CHUNK_SAMPLES,
            gate_threshold: NOISE_GATE_THRESHOLD,
            normalize_ceiling: NORMALIZE_CEILING,
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the sender binds to
    pub bind_address: IpAddr,
    /// Well-known sender port
    pub port: u16,
    /// Sender pacing interval in milliseconds
    pub send_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: SERVER_PORT,
            send_interval_ms: SEND_INTERVAL_MS,
        }
    }
}

/// Receiver-side recording settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory recorded files are written into
    pub output_dir: PathBuf,
    /// Frame rate stamped into the recorded video
    pub fps: f64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            fps: RECORD_FPS,
        }
    }
}

impl AppConfig {
    /// Path of the optional config file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lan-av-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the config file if present, otherwise the defaults
    pub fn load_or_default() -> Result<Self, Error> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.video.width, 480);
        assert_eq!(config.video.height, 320);
        assert_eq!(config.video.jpeg_quality, 50);
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.chunk_samples, 1024);
        assert_eq!(config.network.port, 9999);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [video]
            jpeg_quality = 70

            [network]
            port = 4242
            "#,
        )
        .unwrap();

        assert_eq!(config.video.jpeg_quality, 70);
        assert_eq!(config.network.port, 4242);
        // Untouched sections keep their defaults
        assert_eq!(config.video.width, 480);
        assert_eq!(config.audio.chunk_samples, 1024);
    }
}
