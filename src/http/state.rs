use crate::audio::{AudioEncoding, ChunkConfig, FileValidator};
use crate::config::{Config, SttConfig};
use crate::recognizer::{Recognizer, RecognizerConfig, TranscriptionOptions};
use crate::session::{MediatorConfig, SessionRegistry, SpeechSessionHandler};
use crate::transcription::{SyncTranscriber, UploadStreamer};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub stt: Arc<SttConfig>,

    /// Live duplex sessions (session_id → mediator)
    pub sessions: Arc<SessionRegistry>,

    pub validator: Arc<FileValidator>,
    pub transcriber: Arc<SyncTranscriber>,
    pub upload_streamer: Arc<UploadStreamer>,
    pub socket_handler: Arc<SpeechSessionHandler>,
}

impl AppState {
    pub fn new(config: &Config, recognizer: Arc<dyn Recognizer>) -> Self {
        let stt = config.stt.clone();
        let sessions = Arc::new(SessionRegistry::new());

        // Live sockets carry raw PCM with the configured languages
        let socket_config = MediatorConfig::new(
            RecognizerConfig::build(
                AudioEncoding::Linear16,
                &stt.default_language_code,
                true,
                false,
                stt.alternative_language_codes(),
            ),
            stt.ws_interim_results,
        );

        Self {
            validator: Arc::new(FileValidator::from_config(&stt)),
            transcriber: Arc::new(SyncTranscriber::new(Arc::clone(&recognizer))),
            upload_streamer: Arc::new(UploadStreamer::new(
                Arc::clone(&recognizer),
                ChunkConfig::from_config(&stt),
            )),
            socket_handler: Arc::new(SpeechSessionHandler::new(
                recognizer,
                Arc::clone(&sessions),
                socket_config,
            )),
            sessions,
            stt: Arc::new(stt),
        }
    }

    /// Options a request starts from before its own form fields apply
    pub fn default_options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            language_code: self.stt.default_language_code.clone(),
            alternative_language_codes: self.stt.alternative_language_codes(),
            ..Default::default()
        }
    }
}
