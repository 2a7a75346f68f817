use tokio::sync::mpsc;

use super::config::RecognizerConfig;
use crate::error::SpeechError;

/// First message of every streaming call
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub config: RecognizerConfig,
    pub interim_results: bool,
}

/// Client half of the duplex recognizer call
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingRequest {
    Config(StreamingConfig),
    Audio(Vec<u8>),
}

impl StreamingRequest {
    pub fn is_config(&self) -> bool {
        matches!(self, StreamingRequest::Config(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alternative {
    pub transcript: String,
    /// 0.0 when the recognizer did not report one
    pub confidence: f32,
}

/// One result of a unary recognize call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognitionResult {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamingResult {
    pub alternatives: Vec<Alternative>,
    pub is_final: bool,
}

/// One server message of the duplex call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamingResponse {
    pub results: Vec<StreamingResult>,
}

/// An open duplex call.
///
/// Dropping `requests` half-closes the call. The end of `responses` is the
/// recognizer's completion; an `Err` item is its failure and is always last.
pub struct RecognizerStream {
    pub requests: mpsc::Sender<StreamingRequest>,
    pub responses: mpsc::Receiver<Result<StreamingResponse, SpeechError>>,
}
