//! Receiving side of the length-prefixed TCP stream

use super::stats::{StatsCounter, StreamStats};
use crate::codec;
use crate::error::StreamError;
use crate::framing::{self, DEFAULT_MAX_FRAME_LEN};
use bytes::Bytes;
use image::RgbImage;
use tokio::io::AsyncRead;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

/// A received JPEG together with its decoded pixels
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Position in the stream, starting at 0
    pub sequence: u64,

    /// Payload exactly as it came off the wire
    pub jpeg: Bytes,

    pub image: RgbImage,
}

/// Reads length-prefixed frames from one byte stream
pub struct FrameReceiver<R = TcpStream> {
    reader: R,
    max_frame_len: u32,
    stats: StatsCounter,
}

impl FrameReceiver<TcpStream> {
    /// Connects to a frame server
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, StreamError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        info!(peer = %stream.peer_addr()?, "Connected to frame server");

        Ok(Self::new(stream))
    }
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            stats: StatsCounter::new(),
        }
    }

    /// Rejects frames whose header advertises more than `max` bytes
    pub fn with_max_frame_len(mut self, max: u32) -> Self {
        self.max_frame_len = max;
        self
    }

    /// Next raw payload, or `None` once the sender closed the stream
    pub async fn recv(&mut self) -> Result<Option<Bytes>, StreamError> {
        let Some(payload) = framing::read_frame(&mut self.reader, self.max_frame_len).await? else {
            debug!("Stream closed by sender");
            return Ok(None);
        };

        self.stats.record_frame(payload.len());
        Ok(Some(payload))
    }

    /// Next payload decoded as JPEG
    ///
    /// Decoding runs on the blocking pool. A payload that fails to decode is
    /// returned as `StreamError::Decode`; the stream itself stays usable.
    pub async fn recv_decoded(&mut self) -> Result<Option<DecodedFrame>, StreamError> {
        let Some(jpeg) = self.recv().await? else {
            return Ok(None);
        };
        let sequence = self.stats.snapshot().frames - 1;

        let data = jpeg.clone();
        let image = tokio::task::spawn_blocking(move || codec::decode_jpeg(&data)).await??;

        Ok(Some(DecodedFrame {
            sequence,
            jpeg,
            image,
        }))
    }

    pub fn stats(&self) -> StreamStats {
        self.stats.snapshot()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
