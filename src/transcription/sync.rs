use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::AudioEncoding;
use crate::error::SpeechError;
use crate::recognizer::{RecognitionResult, Recognizer, TranscriptionOptions};

/// Outcome of a one-shot transcription
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    /// Never empty
    pub text: String,
    /// Mean of the positive confidences, 0.0 if none were reported
    pub average_confidence: f32,
    /// Number of recognizer results that carried an alternative
    pub result_count: usize,
}

/// Sends a whole file to the recognizer in a single call
pub struct SyncTranscriber {
    recognizer: Arc<dyn Recognizer>,
}

impl SyncTranscriber {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        encoding: AudioEncoding,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult, SpeechError> {
        options.validate()?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        let config = options.recognizer_config(encoding);
        info!(
            "Recognizing {} bytes on {} ({}, {}Hz, {})",
            audio.len(),
            self.recognizer.name(),
            config.encoding,
            config.sample_rate_hertz,
            config.language_code
        );

        let started = Instant::now();
        let results = self
            .recognizer
            .recognize(&config, audio)
            .await
            .map_err(|e| match e {
                SpeechError::Recognizer(_) => e,
                other => SpeechError::Recognizer(other.to_string()),
            })?;

        let result = aggregate(&results).inspect_err(|_| {
            warn!("Recognizer returned no transcript ({} results)", results.len());
        })?;

        info!(
            "Recognition finished in {}ms: {} results, confidence {:.2}",
            started.elapsed().as_millis(),
            result.result_count,
            result.average_confidence
        );

        Ok(result)
    }
}

/// Join the first alternative of every result, in order.
///
/// Fails with `EmptyResult` when there is nothing left after trimming.
pub fn aggregate(results: &[RecognitionResult]) -> Result<TranscriptionResult, SpeechError> {
    let mut text = String::new();
    let mut confidence_sum = 0.0f32;
    let mut confidence_count = 0usize;
    let mut result_count = 0usize;

    for alternative in results.iter().filter_map(|r| r.alternatives.first()) {
        text.push_str(&alternative.transcript);
        result_count += 1;
        if alternative.confidence > 0.0 {
            confidence_sum += alternative.confidence;
            confidence_count += 1;
        }
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(SpeechError::EmptyResult);
    }

    let average_confidence = if confidence_count > 0 {
        confidence_sum / confidence_count as f32
    } else {
        0.0
    };

    Ok(TranscriptionResult {
        text: text.to_string(),
        average_confidence,
        result_count,
    })
}
