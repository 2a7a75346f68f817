pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod recognizer;
pub mod session;
pub mod transcription;

pub use audio::{AudioEncoding, AudioFrame, AudioUpload, ChunkConfig, FileValidator};
pub use config::Config;
pub use error::SpeechError;
pub use http::{create_router, AppState, SttResponse};
pub use recognizer::{GoogleSpeechClient, Recognizer, RecognizerConfig, TranscriptionOptions};
pub use session::{
    MediatorConfig, MediatorState, SessionRegistry, SpeechSessionHandler, StreamingMediator,
    TranscriptEvent,
};
pub use transcription::{SyncTranscriber, TranscriptionResult, UploadStreamer};
