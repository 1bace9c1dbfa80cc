//! Deterministic moving test pattern

use super::{CaptureError, FrameSource};
use crate::frame::{Frame, RGB_CHANNELS};
use std::time::{Duration, Instant};

/// Synthetic source producing a scrolling gradient with a vertical bar
///
/// Frame `n` is a pure function of `(width, height, n)`, so tests can
/// recompute the exact pixels a given frame index carries.
pub struct PatternSource {
    width: u32,
    height: u32,
    frame_index: u64,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl PatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
            frame_interval: None,
            last_frame: None,
        }
    }

    /// Paces `next_frame` to at most `fps` frames per second (0 = unpaced)
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 {
            None
        } else {
            Some(Duration::from_secs(1) / fps)
        };
        self
    }

    /// Index of the next frame to be produced
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Renders frame `index` without advancing the source
    pub fn render(width: u32, height: u32, index: u64) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(Frame::expected_len(width, height));
        let shift = (index % 256) as u32;
        let bar_x = if width == 0 {
            0
        } else {
            (index % width as u64) as u32
        };

        for y in 0..height {
            for x in 0..width {
                if x == bar_x {
                    pixels.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
                    continue;
                }
                pixels.push(((x + shift) % 256) as u8);
                pixels.push(((y + shift * 2) % 256) as u8);
                pixels.push(((x ^ y) % 256) as u8);
            }
        }

        debug_assert_eq!(pixels.len() % RGB_CHANNELS, 0);
        pixels
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.pace();

        let pixels = Self::render(self.width, self.height, self.frame_index);
        self.frame_index += 1;

        Ok(Frame::new(self.width, self.height, pixels))
    }

    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_deterministic() {
        let mut source = PatternSource::new(16, 8);
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();

        assert_eq!(first.pixels(), PatternSource::render(16, 8, 0).as_slice());
        assert_eq!(second.pixels(), PatternSource::render(16, 8, 1).as_slice());
        assert_ne!(first.pixels(), second.pixels());
        assert_eq!(source.frame_index(), 2);
    }

    #[test]
    fn test_pattern_dimensions() {
        let mut source = PatternSource::new(320, 240);
        let frame = source.next_frame().unwrap();
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixels().len(), 320 * 240 * 3);
    }

    #[test]
    fn test_frame_rate_pacing() {
        let mut source = PatternSource::new(2, 2).with_frame_rate(50);
        let start = Instant::now();
        for _ in 0..3 {
            source.next_frame().unwrap();
        }
        // two paced gaps of 20 ms after the first frame
        assert!(start.elapsed() >= Duration::from_millis(35));
    }
}
