//! Configuration management for both streaming pipelines

use crate::capture::platform;
use crate::framing::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub push: PushConfig,

    #[serde(default)]
    pub socket: SocketConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Which frame source feeds the pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Synthetic moving test pattern
    Pattern,

    /// Physical camera through GStreamer (requires the `camera` feature)
    Camera,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_source")]
    pub source: SourceKind,

    /// Camera device
    /// - any platform: "0" for the first camera, "1" for the second, etc.
    /// - Linux: "/dev/video0"
    /// - Raspberry Pi: "/base/axi/pcie@1000120000/rp1/i2c@88000/imx219@10"
    #[serde(default = "default_device")]
    pub device: String,

    /// Capture width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Capture height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames per second (0 = as fast as the source delivers)
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            device: default_device(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

/// Browser push channel (HTTP + WebSocket) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    #[serde(default = "default_push_port")]
    pub port: u16,

    /// Timer period between frames of one connection (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Width frames are resized to before encoding
    #[serde(default = "default_push_width")]
    pub width: u32,

    /// Height frames are resized to before encoding
    #[serde(default = "default_push_height")]
    pub height: u32,

    /// JPEG quality (1-100)
    #[serde(default = "default_push_quality")]
    pub quality: u8,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            port: default_push_port(),
            interval_ms: default_interval_ms(),
            width: default_push_width(),
            height: default_push_height(),
            quality: default_push_quality(),
        }
    }
}

impl PushConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }
}

/// Length-prefixed TCP stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Address the sender listens on
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    /// Host the receiver connects to
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_socket_port")]
    pub port: u16,

    /// JPEG quality (1-100)
    #[serde(default = "default_socket_quality")]
    pub quality: u8,

    /// Largest payload the receiver accepts in bytes (u32::MAX = no limit)
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            host: default_host(),
            port: default_socket_port(),
            quality: default_socket_quality(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl SocketConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }

    pub fn connect_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings shared by both delivery loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Consecutive capture/encode failures tolerated before a loop ends
    /// (0 = end on the first failure)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Log statistics every N frames (0 = never)
    #[serde(default = "default_stats_interval_frames")]
    pub stats_interval_frames: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            stats_interval_frames: default_stats_interval_frames(),
        }
    }
}

// Default value functions
fn default_source() -> SourceKind {
    SourceKind::Pattern
}
fn default_device() -> String {
    platform::default_device_path(platform::detect_platform(), 0)
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_fps() -> u32 {
    30
}
fn default_bind_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_push_port() -> u16 {
    3000
}
fn default_interval_ms() -> u64 {
    30
}
fn default_push_width() -> u32 {
    320
}
fn default_push_height() -> u32 {
    240
}
fn default_push_quality() -> u8 {
    80
}
fn default_socket_port() -> u16 {
    8485
}
fn default_socket_quality() -> u8 {
    90
}
fn default_max_frame_bytes() -> u32 {
    DEFAULT_MAX_FRAME_LEN
}
fn default_max_consecutive_failures() -> u32 {
    5
}
fn default_stats_interval_frames() -> u64 {
    100
}

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        if cam.width == 0 || cam.height == 0 {
            return Err(ConfigError::Invalid(
                "camera: width and height must be > 0".to_string(),
            ));
        }
        if cam.fps > 120 {
            return Err(ConfigError::Invalid(format!(
                "camera: FPS must be between 0 and 120, got {}",
                cam.fps
            )));
        }
        if cam.source == SourceKind::Camera && cam.device.is_empty() {
            return Err(ConfigError::Invalid(
                "camera: device must be set when source = \"camera\"".to_string(),
            ));
        }

        let push = &self.push;
        if push.width == 0 || push.height == 0 {
            return Err(ConfigError::Invalid(
                "push: width and height must be > 0".to_string(),
            ));
        }
        if push.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "push: interval_ms must be > 0".to_string(),
            ));
        }
        validate_quality("push", push.quality)?;

        let socket = &self.socket;
        if socket.host.is_empty() {
            return Err(ConfigError::Invalid("socket: host must be set".to_string()));
        }
        validate_quality("socket", socket.quality)?;

        Ok(())
    }
}

fn validate_quality(section: &str, quality: u8) -> Result<(), ConfigError> {
    if quality == 0 || quality > 100 {
        return Err(ConfigError::Invalid(format!(
            "{}: quality must be between 1 and 100, got {}",
            section, quality
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera.source, SourceKind::Pattern);
        assert_eq!(config.push.port, 3000);
        assert_eq!(config.push.interval_ms, 30);
        assert_eq!((config.push.width, config.push.height), (320, 240));
        assert_eq!(config.socket.port, 8485);
        assert_eq!(config.socket.connect_addr(), "127.0.0.1:8485");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
[camera]
source = "camera"
device = "/dev/video2"
width = 1280
height = 720
fps = 15

[push]
port = 3100
interval_ms = 50
quality = 70

[socket]
host = "192.168.1.20"
port = 9000
max_frame_bytes = 1048576

[pipeline]
max_consecutive_failures = 0
        "#;

        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.camera.source, SourceKind::Camera);
        assert_eq!(config.camera.device, "/dev/video2");
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.camera.fps, 15);
        assert_eq!(config.push.bind_addr(), "0.0.0.0:3100");
        assert_eq!(config.push.interval_ms, 50);
        assert_eq!(config.push.width, 320);
        assert_eq!(config.socket.connect_addr(), "192.168.1.20:9000");
        assert_eq!(config.socket.max_frame_bytes, 1_048_576);
        assert_eq!(config.pipeline.max_consecutive_failures, 0);
        assert_eq!(config.pipeline.stats_interval_frames, 100);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.socket.port, 8485);
        assert_eq!(config.push.quality, 80);
    }

    #[test]
    fn test_invalid_quality() {
        let toml = r#"
[socket]
quality = 0
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_invalid_interval() {
        let toml = r#"
[push]
interval_ms = 0
        "#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let toml = r#"
[camera]
source = "screen"
        "#;
        assert!(matches!(Config::from_str(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.socket.port = 18485;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.socket.port, 18485);
        assert_eq!(loaded.push.port, config.push.port);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
        assert_eq!(config.camera.source, SourceKind::Pattern);
        assert_eq!(config.socket.max_frame_bytes, u32::MAX);
    }
}
