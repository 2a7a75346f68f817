use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recognizer::StreamingResponse;

/// A transcript fragment relayed from the recognizer, in delivery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,

    /// Whether the recognizer will revise this text further
    pub is_final: bool,

    /// Confidence score (0.0 to 1.0), if reported
    pub confidence: Option<f32>,
}

/// Outbound text frame on the duplex socket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFrame {
    pub transcript: String,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<&TranscriptEvent> for TranscriptFrame {
    fn from(event: &TranscriptEvent) -> Self {
        Self {
            transcript: event.text.clone(),
            is_final: event.is_final,
            confidence: event.confidence,
        }
    }
}

/// Split a recognizer response into transcript events.
///
/// Each result contributes its first alternative; results without
/// alternatives are skipped.
pub fn demultiplex(response: StreamingResponse) -> Vec<TranscriptEvent> {
    response
        .results
        .into_iter()
        .filter_map(|result| {
            let is_final = result.is_final;
            result.alternatives.into_iter().next().map(|alt| TranscriptEvent {
                text: alt.transcript,
                is_final,
                confidence: (alt.confidence > 0.0).then_some(alt.confidence),
            })
        })
        .collect()
}

/// Lifecycle of a streaming mediator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediatorState {
    /// Recognizer call open, nothing sent yet
    Open,
    /// Configuration sent, audio flowing
    ConfigSent,
    /// Request stream half-closed, waiting for the recognizer to finish
    Closing,
    /// Terminal
    Closed,
}

impl MediatorState {
    pub fn accepts_audio(&self) -> bool {
        matches!(self, MediatorState::Open | MediatorState::ConfigSent)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, MediatorState::Closed)
    }
}

/// Snapshot of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub state: MediatorState,
    pub created_at: DateTime<Utc>,
    /// Audio frames forwarded to the recognizer
    pub frames_sent: usize,
    /// Transcript events handed to the client
    pub transcripts_delivered: usize,
}
