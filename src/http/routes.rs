use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Slack above the upload limit for multipart framing and form fields
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.stt.max_file_size_bytes() as usize + BODY_LIMIT_SLACK;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // File transcription
        .route("/api/v1/speech/convert", post(handlers::convert))
        .route("/api/v1/speech/stream", post(handlers::stream))
        // Live sessions
        .route("/api/v1/speech/sessions", get(handlers::list_sessions))
        .route("/ws/speech", get(ws::speech_socket))
        // Let oversized uploads reach the validator instead of a bare 413
        .layer(DefaultBodyLimit::max(body_limit))
        // Request logging and permissive CORS
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
