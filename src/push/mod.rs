//! Browser push pipeline: viewer page plus a WebSocket per client

mod message;
mod session;
mod web;

pub use message::{PushMessage, FRAME_EVENT};
pub use session::{run_session, SessionEnd, SessionOptions};
pub use web::{router, run_server, serve, HealthResponse, PushState};
