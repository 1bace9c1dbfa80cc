//! Length-prefixed JPEG framing
//!
//! Every message on the wire is a 4-byte little-endian payload length
//! followed by exactly that many payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | len: u32 (LE)  | payload: len bytes (JPEG) |
//! +----------------+---------------------------+
//! ```
//!
//! There is no magic number, version or checksum. A single `read` on the
//! underlying stream may return any fraction of a message, so the reader
//! accumulates until the header and the payload are complete.

use bytes::{Bytes, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length header
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default cap on accepted payloads: none, every `u32` length is legal
pub const DEFAULT_MAX_FRAME_LEN: u32 = u32::MAX;

/// Upper bound on a single payload read, so buffer growth tracks bytes that
/// actually arrived rather than the advertised length
const READ_CHUNK: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum FramingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("stream ended mid-header after {received} of 4 bytes")]
    ShortHeader { received: usize },

    #[error("stream ended mid-payload after {received} of {expected} bytes")]
    ShortPayload { expected: u32, received: usize },

    #[error("payload of {0} bytes does not fit a 4-byte length header")]
    PayloadTooLarge(usize),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u32, max: u32 },
}

/// Encodes the header for a payload of `len` bytes
pub fn encode_header(len: usize) -> Result<[u8; LEN_PREFIX_SIZE], FramingError> {
    let len = u32::try_from(len).map_err(|_| FramingError::PayloadTooLarge(len))?;
    Ok(len.to_le_bytes())
}

/// Writes one message: header, then the whole payload, then flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let header = encode_header(payload.len())?;

    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Reads one message
///
/// Returns `Ok(None)` when the stream ends cleanly on a message boundary.
/// A stream that ends inside the header or the payload is an error, never a
/// truncated frame. Headers above `max_len` are rejected before any payload
/// is read.
pub async fn read_frame<R>(reader: &mut R, max_len: u32) -> Result<Option<Bytes>, FramingError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; LEN_PREFIX_SIZE];
    let received = read_fully(reader, &mut header).await?;

    match received {
        0 => return Ok(None),
        LEN_PREFIX_SIZE => {}
        received => return Err(FramingError::ShortHeader { received }),
    }

    let len = u32::from_le_bytes(header);
    if len > max_len {
        return Err(FramingError::FrameTooLarge { len, max: max_len });
    }

    read_payload(reader, len).await.map(Some)
}

/// Fills `buf` across as many reads as needed; returns bytes read before EOF
async fn read_fully<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn read_payload<R>(reader: &mut R, len: u32) -> Result<Bytes, FramingError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let expected = len as usize;
    let mut payload = BytesMut::with_capacity(expected.min(READ_CHUNK));

    while payload.len() < expected {
        let want = (expected - payload.len()).min(READ_CHUNK);
        payload.reserve(want);

        let n = (&mut *reader)
            .take(want as u64)
            .read_buf(&mut payload)
            .await?;

        if n == 0 {
            return Err(FramingError::ShortPayload {
                expected: len,
                received: payload.len(),
            });
        }
    }

    Ok(payload.freeze())
}
