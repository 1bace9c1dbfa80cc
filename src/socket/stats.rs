//! Streaming statistics

use serde::{Deserialize, Serialize};

/// Snapshot of one loop's counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Frames written to (or read from) the stream
    pub frames: u64,

    /// Payload bytes, excluding length headers
    pub bytes: u64,

    /// Frames skipped because capture or encode failed
    pub frames_skipped: u64,
}

impl StreamStats {
    /// Calculates frame rate based on delta
    pub fn calculate_fps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let frames_delta = self.frames.saturating_sub(previous.frames);
        frames_delta as f64 / elapsed_secs
    }

    /// Calculates bitrate in kbps based on delta
    pub fn calculate_bitrate_kbps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let bytes_delta = self.bytes.saturating_sub(previous.bytes);
        (bytes_delta as f64 * 8.0) / elapsed_secs / 1000.0
    }

    /// Mean payload size in bytes
    pub fn average_frame_bytes(&self) -> u64 {
        if self.frames == 0 {
            return 0;
        }
        self.bytes / self.frames
    }
}

/// Counters owned by one sender or receiver
#[derive(Debug, Clone, Default)]
pub struct StatsCounter {
    current: StreamStats,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, payload_len: usize) {
        self.current.frames += 1;
        self.current.bytes += payload_len as u64;
    }

    pub fn record_skip(&mut self) {
        self.current.frames_skipped += 1;
    }

    pub fn snapshot(&self) -> StreamStats {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_fps() {
        let prev = StreamStats {
            frames: 100,
            ..Default::default()
        };

        let current = StreamStats {
            frames: 130,
            ..Default::default()
        };

        assert_eq!(current.calculate_fps(&prev, 1.0), 30.0);
        assert_eq!(current.calculate_fps(&prev, 0.0), 0.0);
    }

    #[test]
    fn test_calculate_bitrate() {
        let prev = StreamStats::default();
        let current = StreamStats {
            bytes: 125_000, // 125KB in 1 second = 1000 kbps
            ..Default::default()
        };

        assert_eq!(current.calculate_bitrate_kbps(&prev, 1.0), 1000.0);
    }

    #[test]
    fn test_counter_snapshot() {
        let mut counter = StatsCounter::new();
        counter.record_frame(5);
        counter.record_frame(0);
        counter.record_frame(1_000);
        counter.record_skip();

        let stats = counter.snapshot();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.bytes, 1_005);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.average_frame_bytes(), 335);
    }
}
