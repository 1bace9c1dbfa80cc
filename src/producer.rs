//! Capture + encode as one sequential step, shared by both pipelines

use crate::capture::FrameSource;
use crate::codec::Encoder;
use crate::error::StreamError;
use crate::frame::EncodedFrame;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

struct ProducerInner {
    source: Box<dyn FrameSource>,
    encoder: Box<dyn Encoder>,
}

/// Owns one frame source and one encoder
///
/// Each `produce` call captures a frame and encodes it before returning, so a
/// caller that awaits it before sending never has more than one frame in
/// flight. Clones share the same source; the mutex keeps the device from
/// being read by two threads at once.
#[derive(Clone)]
pub struct FrameProducer {
    inner: Arc<Mutex<ProducerInner>>,
    sequence: Arc<AtomicU64>,
}

impl FrameProducer {
    pub fn new(source: Box<dyn FrameSource>, encoder: Box<dyn Encoder>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProducerInner { source, encoder })),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Captures and encodes one frame on the calling thread
    pub fn produce_blocking(&self) -> Result<EncodedFrame, StreamError> {
        let mut inner = self.inner.lock();
        let frame = inner.source.next_frame()?;
        let encoded = inner.encoder.compress(&frame)?;
        drop(inner);

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(encoded.with_sequence(sequence))
    }

    /// Captures and encodes one frame on tokio's blocking pool
    pub async fn produce(&self) -> Result<EncodedFrame, StreamError> {
        let producer = self.clone();
        tokio::task::spawn_blocking(move || producer.produce_blocking()).await?
    }

    /// Number of frames produced so far
    pub fn frames_produced(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Description of the underlying source for logs
    pub fn describe(&self) -> String {
        self.inner.lock().source.describe()
    }
}

/// Tracks consecutive capture/encode failures for one loop
///
/// Transient failures skip the current frame until `max_consecutive` of them
/// happen in a row. Non-transient errors are returned immediately.
#[derive(Debug, Clone)]
pub struct FailureBudget {
    max_consecutive: u32,
    consecutive: u32,
    total: u64,
}

impl FailureBudget {
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            max_consecutive,
            consecutive: 0,
            total: 0,
        }
    }

    /// Resets the consecutive counter after a good frame
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Returns `Ok(())` when the loop should skip this frame and carry on
    pub fn record_failure(&mut self, err: StreamError) -> Result<(), StreamError> {
        if !err.is_transient() {
            return Err(err);
        }

        self.consecutive = self.consecutive.saturating_add(1);
        self.total = self.total.saturating_add(1);

        if self.consecutive > self.max_consecutive {
            return Err(StreamError::FailureBudgetExhausted {
                failures: self.consecutive,
                last: Box::new(err),
            });
        }

        warn!(
            error = %err,
            consecutive = %self.consecutive,
            budget = %self.max_consecutive,
            "Skipping frame"
        );
        Ok(())
    }

    /// Failures skipped since the loop started
    pub fn total_failures(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, PatternSource};
    use crate::codec::{looks_like_jpeg, JpegEncoder};
    use crate::frame::Frame;

    struct FlakySource {
        inner: PatternSource,
        fail_every: u64,
        calls: u64,
    }

    impl FrameSource for FlakySource {
        fn next_frame(&mut self) -> Result<Frame, CaptureError> {
            self.calls += 1;
            if self.calls % self.fail_every == 0 {
                return Err(CaptureError::Device("device busy".to_string()));
            }
            self.inner.next_frame()
        }
    }

    #[test]
    fn test_produce_assigns_sequence() {
        let producer = FrameProducer::new(
            Box::new(PatternSource::new(16, 16)),
            Box::new(JpegEncoder::new(90)),
        );

        let first = producer.produce_blocking().unwrap();
        let second = producer.produce_blocking().unwrap();

        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
        assert!(looks_like_jpeg(first.as_bytes()));
        assert_eq!(producer.frames_produced(), 2);
    }

    #[tokio::test]
    async fn test_produce_async() {
        let producer = FrameProducer::new(
            Box::new(PatternSource::new(32, 24)),
            Box::new(JpegEncoder::new(80).with_resize(16, 12)),
        );

        let frame = producer.produce().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 12));
    }

    #[test]
    fn test_capture_error_propagates() {
        let producer = FrameProducer::new(
            Box::new(FlakySource {
                inner: PatternSource::new(8, 8),
                fail_every: 1,
                calls: 0,
            }),
            Box::new(JpegEncoder::new(90)),
        );

        assert!(matches!(
            producer.produce_blocking(),
            Err(StreamError::Capture(CaptureError::Device(_)))
        ));
        assert_eq!(producer.frames_produced(), 0);
    }

    #[test]
    fn test_budget_skips_then_trips() {
        let mut budget = FailureBudget::new(2);
        let busy = || StreamError::from(CaptureError::Device("busy".to_string()));

        assert!(budget.record_failure(busy()).is_ok());
        assert!(budget.record_failure(busy()).is_ok());
        match budget.record_failure(busy()) {
            Err(StreamError::FailureBudgetExhausted { failures, .. }) => assert_eq!(failures, 3),
            other => panic!("expected FailureBudgetExhausted, got {:?}", other),
        }
        assert_eq!(budget.total_failures(), 3);
    }

    #[test]
    fn test_budget_resets_on_success() {
        let mut budget = FailureBudget::new(1);
        let busy = || StreamError::from(CaptureError::Device("busy".to_string()));

        for _ in 0..5 {
            assert!(budget.record_failure(busy()).is_ok());
            budget.record_success();
        }
        assert_eq!(budget.total_failures(), 5);
    }

    #[test]
    fn test_unbounded_budget_saturates() {
        let mut budget = FailureBudget {
            max_consecutive: u32::MAX,
            consecutive: u32::MAX - 1,
            total: 0,
        };
        let busy = || StreamError::from(CaptureError::Device("busy".to_string()));

        assert!(budget.record_failure(busy()).is_ok());
        assert!(budget.record_failure(busy()).is_ok());
        assert_eq!(budget.total_failures(), 2);
    }

    #[test]
    fn test_describe_names_source() {
        let producer = FrameProducer::new(
            Box::new(PatternSource::new(16, 8)),
            Box::new(JpegEncoder::new(90)),
        );
        assert_eq!(producer.describe(), "test pattern 16x8");
    }

    #[test]
    fn test_zero_budget_fails_fast() {
        let mut budget = FailureBudget::new(0);
        let err = StreamError::from(CaptureError::Device("busy".to_string()));
        assert!(budget.record_failure(err).is_err());
    }

    #[test]
    fn test_fatal_error_not_budgeted() {
        let mut budget = FailureBudget::new(10);
        let eos = StreamError::from(CaptureError::EndOfStream);
        assert!(matches!(
            budget.record_failure(eos),
            Err(StreamError::Capture(CaptureError::EndOfStream))
        ));
        assert_eq!(budget.total_failures(), 0);
    }
}
