//! Crate-wide error taxonomy

use crate::capture::CaptureError;
use crate::codec::EncodeError;
use crate::framing::FramingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("framing failed: {0}")]
    Framing(#[from] FramingError),

    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("capture task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("giving up after {failures} consecutive frame failures, last: {last}")]
    FailureBudgetExhausted {
        failures: u32,
        last: Box<StreamError>,
    },
}

impl StreamError {
    /// Capture and encode failures may clear up on the next frame;
    /// everything else ends the loop that hit it.
    pub fn is_transient(&self) -> bool {
        match self {
            StreamError::Capture(CaptureError::EndOfStream | CaptureError::Unsupported) => false,
            StreamError::Capture(_) | StreamError::Encode(_) => true,
            _ => false,
        }
    }

    /// True when the peer went away rather than the stream breaking
    pub fn is_disconnect(&self) -> bool {
        match self {
            StreamError::Framing(FramingError::Io(e)) | StreamError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}
