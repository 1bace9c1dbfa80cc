//! JPEG encoding and decoding through the `image` crate

use crate::frame::{EncodedFrame, Frame};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// JPEG start-of-image marker
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("cannot encode an empty {width}x{height} frame")]
    EmptyFrame { width: u32, height: u32 },

    #[error("JPEG encode failed: {0}")]
    Codec(#[from] image::ImageError),
}

/// Compresses one raw frame into an encoded frame
pub trait Encoder: Send {
    fn compress(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError>;
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn compress(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        (**self).compress(frame)
    }
}

/// Baseline JPEG encoder with an optional resize step
#[derive(Debug, Clone)]
pub struct JpegEncoder {
    quality: u8,
    resize: Option<(u32, u32)>,
}

impl JpegEncoder {
    /// Encodes at native resolution with the given quality (clamped to 1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            resize: None,
        }
    }

    /// Resizes every frame to `width`x`height` before encoding
    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn to_image(frame: &Frame) -> Result<RgbImage, EncodeError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(EncodeError::EmptyFrame { width, height });
        }

        let expected = Frame::expected_len(width, height);
        let actual = frame.pixels().len();
        RgbImage::from_raw(width, height, frame.pixels().to_vec()).ok_or(
            EncodeError::BufferSize {
                width,
                height,
                expected,
                actual,
            },
        )
    }
}

impl Encoder for JpegEncoder {
    fn compress(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        let mut image = Self::to_image(frame)?;

        if let Some((width, height)) = self.resize {
            if (width, height) != image.dimensions() {
                image = imageops::resize(&image, width, height, FilterType::Triangle);
            }
        }

        let mut buf = Cursor::new(Vec::with_capacity(image.as_raw().len() / 8));
        let encoder = ImageJpegEncoder::new_with_quality(&mut buf, self.quality);
        image.write_with_encoder(encoder)?;

        let (width, height) = image.dimensions();
        Ok(EncodedFrame::new(
            Bytes::from(buf.into_inner()),
            width,
            height,
            frame.captured_at(),
        ))
    }
}

/// Decodes a JPEG payload received from the wire
pub fn decode_jpeg(data: &[u8]) -> Result<RgbImage, image::ImageError> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
    Ok(image.to_rgb8())
}

/// Cheap check for the JPEG SOI marker
pub fn looks_like_jpeg(data: &[u8]) -> bool {
    data.starts_with(&JPEG_SOI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PatternSource;

    fn pattern_frame(width: u32, height: u32) -> Frame {
        Frame::new(width, height, PatternSource::render(width, height, 3))
    }

    #[test]
    fn test_encode_native_resolution() {
        let encoder = JpegEncoder::new(90);
        let encoded = encoder.compress(&pattern_frame(64, 48)).unwrap();

        assert!(looks_like_jpeg(encoded.as_bytes()));
        assert_eq!((encoded.width(), encoded.height()), (64, 48));

        let decoded = decode_jpeg(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_encode_with_resize() {
        let encoder = JpegEncoder::new(80).with_resize(320, 240);
        let encoded = encoder.compress(&pattern_frame(640, 480)).unwrap();

        assert_eq!((encoded.width(), encoded.height()), (320, 240));
        let decoded = decode_jpeg(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (320, 240));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let encoder = JpegEncoder::new(90);
        let frame = Frame::new(8, 8, vec![0; 10]);

        match encoder.compress(&frame) {
            Err(EncodeError::BufferSize {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 8 * 8 * 3);
                assert_eq!(actual, 10);
            }
            other => panic!("expected BufferSize, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_frame_rejected() {
        let encoder = JpegEncoder::new(90);
        let frame = Frame::new(0, 8, Vec::new());
        assert!(matches!(
            encoder.compress(&frame),
            Err(EncodeError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(JpegEncoder::new(0).quality(), 1);
        assert_eq!(JpegEncoder::new(200).quality(), 100);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_jpeg(b"definitely not a jpeg").is_err());
        assert!(!looks_like_jpeg(b"GIF89a"));
    }
}
