use serde::{Deserialize, Serialize};

use crate::recognizer::{RecognizerConfig, StreamingConfig};

/// Configuration for a streaming mediator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Recognition settings injected as the first message of the call
    pub recognition: RecognizerConfig,

    /// Ask the recognizer for interim results.
    /// Live sockets default to true, upload-then-stream to false.
    pub interim_results: bool,
}

impl MediatorConfig {
    pub fn new(recognition: RecognizerConfig, interim_results: bool) -> Self {
        Self {
            recognition,
            interim_results,
        }
    }

    pub fn streaming_config(&self) -> StreamingConfig {
        StreamingConfig {
            config: self.recognition.clone(),
            interim_results: self.interim_results,
        }
    }
}
