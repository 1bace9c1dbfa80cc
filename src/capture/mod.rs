//! Frame sources: the camera device and a synthetic test pattern

#[cfg(feature = "camera")]
mod camera;
mod pattern;
pub mod platform;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use pattern::PatternSource;
pub use platform::PlatformInfo;

use crate::config::{CameraConfig, SourceKind};
use crate::frame::Frame;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("GStreamer error: {0}")]
    Gst(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("state change error: {0}")]
    StateChange(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("camera reached end of stream")]
    EndOfStream,

    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    #[error("camera support not compiled in (rebuild with --features camera)")]
    Unsupported,
}

/// Anything that yields raw frames one at a time
///
/// `next_frame` may block until the device has a frame ready; callers on the
/// async runtime go through `FrameProducer`, which moves the call onto the
/// blocking pool.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Human-readable source name for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Opens the source selected in the camera configuration
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    let source: Box<dyn FrameSource> = match config.source {
        SourceKind::Pattern => Box::new(
            PatternSource::new(config.width, config.height).with_frame_rate(config.fps),
        ),
        SourceKind::Camera => open_camera(config)?,
    };

    info!(
        source = %source.describe(),
        resolution = %format!("{}x{}", config.width, config.height),
        fps = %config.fps,
        "Frame source opened"
    );

    Ok(source)
}

#[cfg(feature = "camera")]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Ok(Box::new(CameraSource::open(config)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_config: &CameraConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_pattern_source() {
        let config = CameraConfig {
            source: SourceKind::Pattern,
            width: 32,
            height: 16,
            fps: 0,
            ..CameraConfig::default()
        };

        let mut source = open_source(&config).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 16);
        assert!(frame.is_well_formed());
    }

    #[cfg(not(feature = "camera"))]
    #[test]
    fn test_camera_requires_feature() {
        let config = CameraConfig {
            source: SourceKind::Camera,
            ..CameraConfig::default()
        };

        assert!(matches!(open_source(&config), Err(CaptureError::Unsupported)));
    }
}
