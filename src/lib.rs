//! Webcam JPEG streaming over the network
//!
//! Two independent delivery pipelines share one capture/encode core:
//! - **push**: an HTTP server whose viewer page opens a WebSocket; each
//!   connection receives base64 JPEG `frame` events on a fixed timer
//! - **socket**: a TCP server that writes `[u32 LE length][JPEG]` messages to
//!   exactly one client, plus the matching receiver
//!
//! Camera and codec are injectable (`FrameSource`, `Encoder`), so everything
//! above them can run against the deterministic `PatternSource`.
//!
//! # Example
//!
//! ```no_run
//! use camstream::capture::PatternSource;
//! use camstream::codec::JpegEncoder;
//! use camstream::FrameProducer;
//!
//! # async fn demo() -> Result<(), camstream::StreamError> {
//! let producer = FrameProducer::new(
//!     Box::new(PatternSource::new(640, 480)),
//!     Box::new(JpegEncoder::new(90)),
//! );
//! let frame = producer.produce().await?;
//! assert_eq!(&frame.as_bytes()[..2], &[0xFF, 0xD8]);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod framing;
pub mod producer;
pub mod push;
pub mod socket;

// Re-exports for convenience
pub use capture::{CaptureError, FrameSource, PatternSource};
pub use codec::{EncodeError, Encoder, JpegEncoder};
pub use config::Config;
pub use error::StreamError;
pub use frame::{EncodedFrame, Frame};
pub use framing::{read_frame, write_frame, FramingError};
pub use producer::{FailureBudget, FrameProducer};
pub use socket::{FrameReceiver, FrameSender, StreamStats};
