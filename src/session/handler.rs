// Duplex socket session handling
//
// Transport-agnostic callbacks for one client connection. The socket layer
// calls on_open once, on_binary per audio frame, then exactly one of
// on_error / on_close.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::config::MediatorConfig;
use super::events::TranscriptFrame;
use super::mediator::{transcript_callback, StreamingMediator};
use super::registry::SessionRegistry;
use crate::error::SpeechError;
use crate::recognizer::Recognizer;

/// Text channel back to a connected client
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), SpeechError>;
}

/// Lifecycle callbacks of a duplex client connection
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn on_open(
        &self,
        session_id: &str,
        sink: Arc<dyn TranscriptSink>,
    ) -> Result<(), SpeechError>;

    async fn on_binary(&self, session_id: &str, payload: Vec<u8>);

    async fn on_error(&self, session_id: &str, error: SpeechError);

    async fn on_close(&self, session_id: &str);
}

/// Wires each connection to its own streaming mediator
pub struct SpeechSessionHandler {
    recognizer: Arc<dyn Recognizer>,
    registry: Arc<SessionRegistry>,
    config: MediatorConfig,
}

impl SpeechSessionHandler {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        registry: Arc<SessionRegistry>,
        config: MediatorConfig,
    ) -> Self {
        Self {
            recognizer,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolves when the session's mediator reaches CLOSED, or immediately
    /// if the session is not registered.
    pub async fn wait_closed(&self, session_id: &str) {
        if let Some(session) = self.registry.get(session_id) {
            session.mediator.closed().await;
        }
    }

    async fn terminate(&self, session_id: &str) {
        if !self.registry.close_session(session_id).await {
            warn!("[{}] Session already terminated", session_id);
        }
    }
}

#[async_trait]
impl SessionHandler for SpeechSessionHandler {
    async fn on_open(
        &self,
        session_id: &str,
        sink: Arc<dyn TranscriptSink>,
    ) -> Result<(), SpeechError> {
        info!("[{}] Client connected", session_id);

        let on_transcript = transcript_callback(move |event| {
            let sink = Arc::clone(&sink);
            async move {
                let frame = serde_json::to_string(&TranscriptFrame::from(&event))
                    .map_err(|e| SpeechError::Transport(e.to_string()))?;
                sink.send_text(frame).await
            }
        });

        let mediator = StreamingMediator::open(
            self.recognizer.as_ref(),
            session_id,
            self.config.clone(),
            on_transcript,
        )
        .await?;

        self.registry.attach(session_id, mediator)?;
        Ok(())
    }

    async fn on_binary(&self, session_id: &str, payload: Vec<u8>) {
        match self.registry.get(session_id) {
            Some(session) => session.mediator.send_audio(payload).await,
            None => warn!(
                "[{}] Audio for unknown session dropped ({} bytes)",
                session_id,
                payload.len()
            ),
        }
    }

    async fn on_error(&self, session_id: &str, error: SpeechError) {
        error!("[{}] Transport error: {}", session_id, error);
        self.terminate(session_id).await;
    }

    async fn on_close(&self, session_id: &str) {
        info!("[{}] Client disconnected", session_id);
        self.terminate(session_id).await;
    }
}
