//! Length-prefixed TCP streaming: one sender, one receiver

mod receiver;
mod sender;
mod stats;

pub use receiver::{DecodedFrame, FrameReceiver};
pub use sender::{serve_one, stream_frames, FrameSender, SenderOptions, SenderServer};
pub use stats::{StatsCounter, StreamStats};

use crate::config::PipelineConfig;

impl From<&PipelineConfig> for SenderOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            stats_interval_frames: config.stats_interval_frames,
            max_frames: None,
        }
    }
}
