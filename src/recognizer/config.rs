use serde::{Deserialize, Serialize};

use crate::audio::AudioEncoding;
use crate::error::SpeechError;

pub const DEFAULT_LANGUAGE_CODE: &str = "ko-KR";
pub const MAX_ALTERNATIVE_LANGUAGES: usize = 3;

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
pub const HIGH_SAMPLE_RATE_HZ: u32 = 48_000;

pub const DEFAULT_MODEL: &str = "default";
pub const LATEST_LONG_MODEL: &str = "latest_long";

/// Per-request user options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionOptions {
    pub language_code: String,
    pub enable_automatic_punctuation: bool,
    pub enable_word_time_offsets: bool,
    pub alternative_language_codes: Vec<String>,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            enable_automatic_punctuation: true,
            enable_word_time_offsets: false,
            alternative_language_codes: Vec::new(),
        }
    }
}

impl TranscriptionOptions {
    pub fn validate(&self) -> Result<(), SpeechError> {
        if self.language_code.trim().is_empty() {
            return Err(SpeechError::InvalidOptions(
                "languageCode must not be empty".to_string(),
            ));
        }

        if self.alternative_language_codes.len() > MAX_ALTERNATIVE_LANGUAGES {
            return Err(SpeechError::InvalidOptions(format!(
                "at most {} alternative language codes are allowed (got {})",
                MAX_ALTERNATIVE_LANGUAGES,
                self.alternative_language_codes.len()
            )));
        }

        Ok(())
    }

    pub fn recognizer_config(&self, encoding: AudioEncoding) -> RecognizerConfig {
        RecognizerConfig::build(
            encoding,
            &self.language_code,
            self.enable_automatic_punctuation,
            self.enable_word_time_offsets,
            self.alternative_language_codes.clone(),
        )
    }
}

/// Recognition settings sent to the recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
    pub enable_automatic_punctuation: bool,
    pub enable_word_time_offsets: bool,
    pub model: String,
    pub use_enhanced: bool,
}

impl RecognizerConfig {
    /// LINEAR16 is treated as 48kHz PCM on the long-form model; compressed
    /// formats use 16kHz on the default model.
    pub fn build(
        encoding: AudioEncoding,
        language_code: &str,
        enable_automatic_punctuation: bool,
        enable_word_time_offsets: bool,
        alternative_language_codes: Vec<String>,
    ) -> Self {
        let encoding = encoding.concrete();
        let (sample_rate_hertz, model) = match encoding {
            AudioEncoding::Linear16 => (HIGH_SAMPLE_RATE_HZ, LATEST_LONG_MODEL),
            _ => (DEFAULT_SAMPLE_RATE_HZ, DEFAULT_MODEL),
        };

        Self {
            encoding,
            sample_rate_hertz,
            language_code: language_code.to_string(),
            alternative_language_codes,
            enable_automatic_punctuation,
            enable_word_time_offsets,
            model: model.to_string(),
            use_enhanced: true,
        }
    }
}
