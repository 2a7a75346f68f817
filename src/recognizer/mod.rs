//! Cloud speech recognizer contract
//!
//! The gateway talks to the recognizer through the [`Recognizer`] trait:
//! - unary recognize for whole uploads
//! - a duplex streaming call exposed as a request channel plus a response channel
//!
//! [`GoogleSpeechClient`] implements it over gRPC; tests substitute their own.

pub mod config;
pub mod google;
pub mod proto;
pub mod types;

pub use config::{RecognizerConfig, TranscriptionOptions};
pub use google::GoogleSpeechClient;
pub use types::{
    Alternative, RecognitionResult, RecognizerStream, StreamingConfig, StreamingRequest,
    StreamingResponse, StreamingResult,
};

use crate::error::SpeechError;

/// Speech recognizer backend
///
/// One instance is shared by every session; implementations hold no
/// per-session state.
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize a complete audio payload in one call
    async fn recognize(
        &self,
        config: &RecognizerConfig,
        audio: Vec<u8>,
    ) -> Result<Vec<RecognitionResult>, SpeechError>;

    /// Open a duplex streaming call. Nothing is sent until the caller writes
    /// to the returned request channel.
    async fn streaming_recognize(&self) -> Result<RecognizerStream, SpeechError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
