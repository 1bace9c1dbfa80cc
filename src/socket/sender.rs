//! Sending side of the length-prefixed TCP stream

use super::stats::{StatsCounter, StreamStats};
use crate::error::StreamError;
use crate::frame::EncodedFrame;
use crate::framing;
use crate::producer::{FailureBudget, FrameProducer};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

/// Writes encoded frames to one byte stream
pub struct FrameSender<W = TcpStream> {
    writer: W,
    stats: StatsCounter,
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stats: StatsCounter::new(),
        }
    }

    /// Writes one frame; returns once header and payload are fully written
    pub async fn send(&mut self, frame: &EncodedFrame) -> Result<(), StreamError> {
        framing::write_frame(&mut self.writer, frame.as_bytes()).await?;
        self.stats.record_frame(frame.len());
        Ok(())
    }

    /// Shuts down the write side so the receiver sees a clean end of stream
    pub async fn finish(&mut self) -> Result<(), StreamError> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub fn stats(&self) -> StreamStats {
        self.stats.snapshot()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Loop settings for `stream_frames`
#[derive(Debug, Clone)]
pub struct SenderOptions {
    /// Consecutive capture/encode failures tolerated (0 = fail fast)
    pub max_consecutive_failures: u32,

    /// Log statistics every N frames (0 = never)
    pub stats_interval_frames: u64,

    /// Stop after this many frames (None = until the client leaves)
    pub max_frames: Option<u64>,
}

impl Default for SenderOptions {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            stats_interval_frames: 100,
            max_frames: None,
        }
    }
}

/// Repeats produce → send until the peer disconnects or the frame limit is hit
///
/// Produce and send strictly alternate, so the next capture starts only after
/// the previous frame is on the wire. Transport errors other than a peer
/// disconnect end the loop with an error; capture/encode errors draw on the
/// failure budget.
pub async fn stream_frames<W>(
    sender: &mut FrameSender<W>,
    producer: &FrameProducer,
    options: &SenderOptions,
) -> Result<StreamStats, StreamError>
where
    W: AsyncWrite + Unpin,
{
    let mut budget = FailureBudget::new(options.max_consecutive_failures);
    let mut sent = 0u64;
    let mut last_report = (Instant::now(), sender.stats());

    loop {
        if options.max_frames.is_some_and(|max| sent >= max) {
            sender.finish().await?;
            info!(frames = %sent, "Frame limit reached");
            break;
        }

        let frame = match producer.produce().await {
            Ok(frame) => {
                budget.record_success();
                frame
            }
            Err(e) => {
                budget.record_failure(e)?;
                sender.stats.record_skip();
                continue;
            }
        };

        match sender.send(&frame).await {
            Ok(()) => {}
            Err(e) if e.is_disconnect() => {
                info!(error = %e, "Client disconnected");
                break;
            }
            Err(e) => return Err(e),
        }

        sent += 1;
        debug!(sequence = %frame.sequence(), bytes = %frame.len(), "Frame sent");

        if options.stats_interval_frames > 0 && sent % options.stats_interval_frames == 0 {
            let stats = sender.stats();
            let (since, previous) = &last_report;
            let elapsed = since.elapsed().as_secs_f64();

            info!(
                frames = %stats.frames,
                bytes = %stats.bytes,
                skipped = %stats.frames_skipped,
                avg_frame_bytes = %stats.average_frame_bytes(),
                fps = %format!("{:.1}", stats.calculate_fps(previous, elapsed)),
                bitrate_kbps = %format!("{:.0}", stats.calculate_bitrate_kbps(previous, elapsed)),
                "Stats"
            );

            last_report = (Instant::now(), stats);
        }
    }

    Ok(sender.stats())
}

/// TCP listener that hands out exactly one client connection
pub struct SenderServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SenderServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, StreamError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Frame server listening");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the single client and closes the listener
    pub async fn accept(self) -> Result<(FrameSender, SocketAddr), StreamError> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        info!(peer = %peer, "Client connected");

        Ok((FrameSender::new(stream), peer))
    }
}

/// Binds, accepts one client and streams to it until it goes away
pub async fn serve_one(
    addr: impl ToSocketAddrs,
    producer: &FrameProducer,
    options: &SenderOptions,
) -> Result<StreamStats, StreamError> {
    let server = SenderServer::bind(addr).await?;
    let (mut sender, peer) = server.accept().await?;

    let stats = stream_frames(&mut sender, producer, options).await?;
    info!(
        peer = %peer,
        frames = %stats.frames,
        bytes = %stats.bytes,
        skipped = %stats.frames_skipped,
        "Stream finished"
    );

    Ok(stats)
}
