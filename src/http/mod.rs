//! HTTP API server
//!
//! - POST /api/v1/speech/convert - Transcribe an uploaded file
//! - POST /api/v1/speech/stream - Transcribe an uploaded file as server-sent events
//! - GET /api/v1/speech/sessions - List live duplex sessions
//! - GET /ws/speech - Duplex socket: binary audio in, JSON transcripts out
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use handlers::SttResponse;
pub use routes::create_router;
pub use state::AppState;
