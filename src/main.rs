//! camstream CLI: browser push server, TCP frame server and TCP viewer

use anyhow::{Context, Result};
use camstream::capture;
use camstream::codec::JpegEncoder;
use camstream::config::{Config, SourceKind};
use camstream::socket::{self, FrameReceiver, SenderOptions};
use camstream::{FrameProducer, StreamError};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "camstream")]
#[command(about = "Webcam JPEG streaming to a browser or over a length-prefixed TCP stream")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the viewer page and push frames over WebSocket
    Push {
        /// HTTP port
        #[arg(long)]
        port: Option<u16>,

        /// Use the synthetic test pattern instead of the camera
        #[arg(long)]
        pattern: bool,
    },

    /// Stream length-prefixed JPEG frames to one TCP client
    Serve {
        /// TCP port
        #[arg(long)]
        port: Option<u16>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Use the synthetic test pattern instead of the camera
        #[arg(long)]
        pattern: bool,
    },

    /// Connect to a frame server and decode what it sends
    View {
        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(long)]
        port: Option<u16>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Write every received JPEG into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = load_config(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH))?;

    let outcome = match cli.command {
        Command::Push { port, pattern } => {
            if let Some(port) = port {
                config.push.port = port;
            }
            use_pattern(&mut config, pattern);
            config.validate()?;

            camstream::push::run_server(&config, shutdown_signal()).await
        }
        Command::Serve {
            port,
            frames,
            pattern,
        } => {
            if let Some(port) = port {
                config.socket.port = port;
            }
            use_pattern(&mut config, pattern);
            config.validate()?;

            run_serve(&config, frames).await
        }
        Command::View {
            host,
            port,
            frames,
            output_dir,
        } => {
            if let Some(host) = host {
                config.socket.host = host;
            }
            if let Some(port) = port {
                config.socket.port = port;
            }
            config.validate()?;

            run_view(&config, frames, output_dir.as_deref()).await
        }
    };

    if let Err(e) = &outcome {
        error!(error = %format!("{:#}", e), "camstream failed");
    }
    outcome
}

/// Explicit paths must exist; the default path is optional
fn load_config(path: Option<&Path>, default_path: &Path) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None if default_path.exists() => default_path,
        None => {
            info!("No configuration file, using defaults");
            return Ok(Config::default());
        }
    };

    info!(config_path = %path.display(), "Loading configuration");
    Config::load(path).with_context(|| format!("loading {}", path.display()))
}

fn use_pattern(config: &mut Config, pattern: bool) {
    if pattern {
        config.camera.source = SourceKind::Pattern;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn run_serve(config: &Config, frames: Option<u64>) -> Result<()> {
    let source = capture::open_source(&config.camera)?;
    let producer = FrameProducer::new(source, Box::new(JpegEncoder::new(config.socket.quality)));

    let options = SenderOptions {
        max_frames: frames,
        ..SenderOptions::from(&config.pipeline)
    };

    info!(
        source = %producer.describe(),
        addr = %config.socket.bind_addr(),
        quality = %config.socket.quality,
        "Starting frame server"
    );

    tokio::select! {
        stats = socket::serve_one(config.socket.bind_addr(), &producer, &options) => {
            let stats = stats?;
            info!(
                frames = %stats.frames,
                bytes = %stats.bytes,
                skipped = %stats.frames_skipped,
                "Frame server done"
            );
        }
        _ = shutdown_signal() => {}
    }

    Ok(())
}

async fn run_view(config: &Config, frames: Option<u64>, output_dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let addr = config.socket.connect_addr();
    info!(addr = %addr, "Connecting to frame server");

    let mut receiver =
        FrameReceiver::connect(&addr).await?.with_max_frame_len(config.socket.max_frame_bytes);

    let mut received = 0u64;
    loop {
        if frames.is_some_and(|max| received >= max) {
            break;
        }

        let frame = match receiver.recv_decoded().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(StreamError::Decode(e)) => {
                warn!(error = %e, "Dropping undecodable frame");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        received += 1;

        info!(
            sequence = %frame.sequence,
            bytes = %frame.jpeg.len(),
            resolution = %format!("{}x{}", frame.image.width(), frame.image.height()),
            "Frame received"
        );

        if let Some(dir) = output_dir {
            let path = dir.join(format!("frame_{:06}.jpg", frame.sequence));
            tokio::fs::write(&path, &frame.jpeg)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    let stats = receiver.stats();
    info!(
        frames = %stats.frames,
        bytes = %stats.bytes,
        avg_frame_bytes = %stats.average_frame_bytes(),
        "Viewer done"
    );

    Ok(())
}
