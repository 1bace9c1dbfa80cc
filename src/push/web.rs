//! HTTP + WebSocket server for the browser viewer

use super::session::{self, run_session, SessionOptions};
use crate::capture;
use crate::codec::JpegEncoder;
use crate::config::Config;
use crate::producer::FrameProducer;
use axum::{
    extract::{
        ws::{close_code, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

const VIEWER_HTML: &str = include_str!("../../web/index.html");

/// Shared server state
#[derive(Clone)]
pub struct PushState {
    producer: FrameProducer,
    lease: Arc<Semaphore>,
    session: SessionOptions,
}

impl PushState {
    /// One camera, one lease: only a single session may push at a time
    pub fn new(producer: FrameProducer, session: SessionOptions) -> Self {
        Self {
            producer,
            lease: Arc::new(Semaphore::new(1)),
            session,
        }
    }

    pub fn from_config(producer: FrameProducer, config: &Config) -> Self {
        Self::new(
            producer,
            SessionOptions {
                period: Duration::from_millis(config.push.interval_ms),
                max_consecutive_failures: config.pipeline.max_consecutive_failures,
            },
        )
    }

    /// True while a session holds the camera
    pub fn is_busy(&self) -> bool {
        self.lease.available_permits() == 0
    }
}

pub fn router(state: PushState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serves the router on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: PushState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "Push server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Opens the configured source and runs the push server
pub async fn run_server(
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let source = capture::open_source(&config.camera)?;
    let encoder = JpegEncoder::new(config.push.quality)
        .with_resize(config.push.width, config.push.height);
    let producer = FrameProducer::new(source, Box::new(encoder));

    let addr = config.push.bind_addr();
    info!(
        source = %producer.describe(),
        "Starting push server on http://{} ({}x{} every {} ms)",
        addr, config.push.width, config.push.height, config.push.interval_ms
    );

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, PushState::from_config(producer, config), shutdown).await
}

/// Viewer page
async fn index_handler() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,

    /// A viewer currently holds the camera
    pub busy: bool,
}

async fn health_handler(State(state): State<PushState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        busy: state.is_busy(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<PushState>) -> Response {
    let permit = match state.lease.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!("Rejecting push client: camera busy");
            return ws.on_upgrade(reject_busy).into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        info!("Push client connected");

        match run_session(socket, state.producer.clone(), state.session.clone()).await {
            Ok((end, frames)) => info!(frames = %frames, end = ?end, "Push client gone"),
            Err(e) => warn!(error = %e, "Push session failed"),
        }

        drop(permit);
    })
    .into_response()
}

async fn reject_busy(socket: WebSocket) {
    let (mut tx, _rx) = socket.split();
    session::close(&mut tx, close_code::AGAIN, "camera busy").await;
}
