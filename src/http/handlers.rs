use super::state::AppState;
use crate::audio::{AudioEncoding, AudioUpload};
use crate::error::SpeechError;
use crate::recognizer::TranscriptionOptions;
use crate::session::{SessionStats, TranscriptEvent};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Instant;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SttResponse {
    pub success: bool,
    pub original_filename: Option<String>,
    pub transcribed_text: Option<String>,
    pub confidence_score: Option<f32>,
    pub processing_time_ms: u64,
    pub language_code: String,
    pub file_size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Encoding the upload was sent to the recognizer as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<AudioEncoding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
}

impl SttResponse {
    fn failure(
        error: &SpeechError,
        upload: &AudioUpload,
        options: &TranscriptionOptions,
        started: Instant,
    ) -> Response {
        (
            error.status_code(),
            Json(Self {
                success: false,
                original_filename: upload.filename.clone(),
                transcribed_text: None,
                confidence_score: None,
                processing_time_ms: started.elapsed().as_millis() as u64,
                language_code: options.language_code.clone(),
                file_size: upload.size(),
                error_message: Some(error.to_string()),
                encoding: None,
                result_count: None,
            }),
        )
            .into_response()
    }
}

/// A parsed speech upload form
#[derive(Debug, Default)]
pub struct SpeechForm {
    pub upload: AudioUpload,
    pub options: TranscriptionOptions,
}

impl SpeechForm {
    /// Read the multipart fields `file`, `enableAutomaticPunctuation`,
    /// `enableWordTimeOffsets`, `languageCode` and `alternativeLanguageCodes`.
    /// Unknown fields are ignored; a missing file yields an empty upload.
    pub async fn read(
        mut multipart: Multipart,
        defaults: TranscriptionOptions,
    ) -> Result<Self, SpeechError> {
        let mut form = SpeechForm {
            upload: AudioUpload::default(),
            options: defaults,
        };

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" => {
                    let filename = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.upload = AudioUpload::new(filename, content_type, bytes.to_vec());
                }
                "enableAutomaticPunctuation" => {
                    let text = field.text().await.map_err(malformed)?;
                    form.options.enable_automatic_punctuation = parse_bool(&name, &text)?;
                }
                "enableWordTimeOffsets" => {
                    let text = field.text().await.map_err(malformed)?;
                    form.options.enable_word_time_offsets = parse_bool(&name, &text)?;
                }
                "languageCode" => {
                    form.options.language_code =
                        field.text().await.map_err(malformed)?.trim().to_string();
                }
                "alternativeLanguageCodes" => {
                    let text = field.text().await.map_err(malformed)?;
                    form.options.alternative_language_codes = text
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                other => warn!("Ignoring unknown form field: {}", other),
            }
        }

        Ok(form)
    }
}

fn malformed(e: axum::extract::multipart::MultipartError) -> SpeechError {
    SpeechError::InvalidOptions(format!("malformed multipart body ({})", e.body_text()))
}

fn parse_bool(field: &str, value: &str) -> Result<bool, SpeechError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(SpeechError::InvalidOptions(format!(
            "{} must be true or false (got {:?})",
            field, other
        ))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/speech/convert
/// Transcribe an uploaded file in a single recognizer call
pub async fn convert(State(state): State<AppState>, multipart: Multipart) -> Response {
    let started = Instant::now();

    let SpeechForm { upload, options } =
        match SpeechForm::read(multipart, state.default_options()).await {
            Ok(form) => form,
            Err(e) => {
                return SttResponse::failure(
                    &e,
                    &AudioUpload::default(),
                    &state.default_options(),
                    started,
                )
            }
        };

    info!(
        "Convert request: {:?} ({} bytes, {})",
        upload.filename,
        upload.size(),
        options.language_code
    );

    if let Err(e) = state.validator.validate(&upload) {
        return SttResponse::failure(&e, &upload, &options, started);
    }

    let encoding = upload.encoding();
    let audio = upload.bytes.clone();

    match state.transcriber.transcribe(audio, encoding, &options).await {
        Ok(result) => (
            StatusCode::OK,
            Json(SttResponse {
                success: true,
                original_filename: upload.filename.clone(),
                transcribed_text: Some(result.text),
                confidence_score: Some(result.average_confidence),
                processing_time_ms: started.elapsed().as_millis() as u64,
                language_code: options.language_code.clone(),
                file_size: upload.size(),
                error_message: None,
                encoding: Some(encoding),
                result_count: Some(result.result_count),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Transcription of {:?} failed: {}", upload.filename, e);
            SttResponse::failure(&e, &upload, &options, started)
        }
    }
}

/// POST /api/v1/speech/stream
/// Replay an uploaded file through the streaming recognizer as server-sent events
pub async fn stream(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let events: BoxStream<'static, Result<Event, Infallible>> =
        match open_upload_stream(&state, multipart).await {
            Ok(transcripts) => transcripts
                .map(|event| Ok(Event::default().data(event.text)))
                .boxed(),
            Err(e) => {
                warn!("Stream request rejected: {}", e);
                futures::stream::once(async move {
                    Ok(Event::default().event("error").data(e.to_string()))
                })
                .boxed()
            }
        };

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn open_upload_stream(
    state: &AppState,
    multipart: Multipart,
) -> Result<BoxStream<'static, TranscriptEvent>, SpeechError> {
    let SpeechForm { upload, options } =
        SpeechForm::read(multipart, state.default_options()).await?;
    state.validator.validate(&upload)?;

    let encoding = upload.encoding();
    info!(
        "Stream request: {:?} ({} bytes, {})",
        upload.filename,
        upload.size(),
        encoding
    );

    state
        .upload_streamer
        .stream(upload.bytes, encoding, &options)
        .await
}

/// GET /api/v1/speech/sessions
/// List live duplex sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<SessionStats> = state.sessions.snapshot();
    (StatusCode::OK, Json(sessions))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
