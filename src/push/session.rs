//! Per-connection push loop

use super::message::PushMessage;
use crate::error::StreamError;
use crate::producer::{FailureBudget, FrameProducer};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Timer and failure settings for one push session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Time between frame ticks
    pub period: Duration,

    /// Consecutive capture/encode failures tolerated (0 = fail fast)
    pub max_consecutive_failures: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(30),
            max_consecutive_failures: 5,
        }
    }
}

/// Why a push session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent a Close frame or the stream ended
    ClientClosed,

    /// Writing a frame message failed
    SendFailed,
}

/// Pushes one frame per tick to `socket` until the client goes away
///
/// Ticks never overlap: a slow capture delays the next tick instead of
/// queueing a burst. When the failure budget runs out the client is sent a
/// Close frame with code 1011 and the error is returned.
pub async fn run_session(
    socket: WebSocket,
    producer: FrameProducer,
    options: SessionOptions,
) -> Result<(SessionEnd, u64), StreamError> {
    let (mut tx, mut rx) = socket.split();

    let mut ticker = time::interval(options.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut budget = FailureBudget::new(options.max_consecutive_failures);
    let mut sent = 0u64;

    let end = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = match producer.produce().await {
                    Ok(frame) => {
                        budget.record_success();
                        frame
                    }
                    Err(e) => match budget.record_failure(e) {
                        Ok(()) => continue,
                        Err(e) => {
                            close(&mut tx, close_code::ERROR, "frame capture failed").await;
                            return Err(e);
                        }
                    },
                };

                let text = PushMessage::frame(&frame).to_text()?;
                if let Err(e) = tx.send(Message::Text(text)).await {
                    debug!(error = %e, "Push send failed");
                    break SessionEnd::SendFailed;
                }

                sent += 1;
                debug!(sequence = %frame.sequence(), bytes = %frame.len(), "Frame pushed");
            }
            incoming = rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break SessionEnd::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Push receive failed");
                    break SessionEnd::ClientClosed;
                }
            },
        }
    };

    info!(frames = %sent, end = ?end, skipped = %budget.total_failures(), "Push session ended");
    Ok((end, sent))
}

/// Sends a Close frame and gives up on the socket
pub(crate) async fn close(
    tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &'static str,
) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };

    if let Err(e) = tx.send(Message::Close(Some(frame))).await {
        warn!(error = %e, code = %code, "Failed to send close frame");
    }
}
