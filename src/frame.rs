//! Captured and encoded frame types

use bytes::Bytes;
use std::time::Instant;

/// Bytes per pixel of the packed RGB8 layout every source produces
pub const RGB_CHANNELS: usize = 3;

/// One raw image grabbed from a source
///
/// Pixels are packed RGB8, row-major, without padding.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    captured_at: Instant,
}

impl Frame {
    /// Wraps a packed RGB8 buffer, stamping it with the current time
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
            captured_at: Instant::now(),
        }
    }

    /// Expected buffer length for the given dimensions
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGB_CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// True when the buffer length matches `width * height * 3`
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == Self::expected_len(self.width, self.height)
    }
}

/// JPEG bytes derived from exactly one `Frame`
///
/// Cloning is cheap: the payload is a shared `Bytes` handle.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    data: Bytes,
    width: u32,
    height: u32,
    sequence: u64,
    captured_at: Instant,
}

impl EncodedFrame {
    pub fn new(data: Bytes, width: u32, height: u32, captured_at: Instant) -> Self {
        Self {
            data,
            width,
            height,
            sequence: 0,
            captured_at,
        }
    }

    /// Sets the producer-assigned sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_frame() {
        let frame = Frame::new(4, 2, vec![0; 4 * 2 * 3]);
        assert!(frame.is_well_formed());

        let short = Frame::new(4, 2, vec![0; 10]);
        assert!(!short.is_well_formed());
    }

    #[test]
    fn test_encoded_frame_sequence() {
        let encoded = EncodedFrame::new(Bytes::from_static(b"jpeg"), 2, 2, Instant::now())
            .with_sequence(7);
        assert_eq!(encoded.sequence(), 7);
        assert_eq!(encoded.len(), 4);
        assert_eq!(encoded.as_bytes(), b"jpeg");
    }
}
