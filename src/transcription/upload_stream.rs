// Upload-then-stream transcription
//
// Replays an uploaded file through a streaming mediator in fixed-size frames
// with a short pause between them, and yields the first final transcript.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::{split_frames, AudioEncoding, ChunkConfig};
use crate::error::SpeechError;
use crate::recognizer::{Recognizer, TranscriptionOptions};
use crate::session::{transcript_callback, MediatorConfig, StreamingMediator, TranscriptEvent};

const EVENT_BUFFER: usize = 16;

pub struct UploadStreamer {
    recognizer: Arc<dyn Recognizer>,
    chunking: ChunkConfig,
}

impl UploadStreamer {
    pub fn new(recognizer: Arc<dyn Recognizer>, chunking: ChunkConfig) -> Self {
        Self {
            recognizer,
            chunking,
        }
    }

    /// Stream `audio` to the recognizer without interim results.
    ///
    /// The returned stream yields final transcripts only and ends after the
    /// first one, or when the recognizer finishes without producing any.
    /// Dropping it stops the upload and half-closes the recognizer call.
    pub async fn stream(
        &self,
        audio: Vec<u8>,
        encoding: AudioEncoding,
        options: &TranscriptionOptions,
    ) -> Result<BoxStream<'static, TranscriptEvent>, SpeechError> {
        options.validate()?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        let session_id = format!("upload-{}", Uuid::new_v4());
        let config = MediatorConfig::new(options.recognizer_config(encoding), false);

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let consumer = event_tx.clone();
        let on_transcript = transcript_callback(move |event: TranscriptEvent| {
            let event_tx = event_tx.clone();
            async move {
                event_tx
                    .send(event)
                    .await
                    .map_err(|_| SpeechError::Transport("event stream closed".to_string()))
            }
        });

        let mediator = StreamingMediator::open(
            self.recognizer.as_ref(),
            session_id.clone(),
            config,
            on_transcript,
        )
        .await?;

        let chunking = self.chunking.clone();
        let total = chunking.chunk_count(audio.len());
        info!(
            "[{}] Streaming {} bytes as {} frames",
            session_id,
            audio.len(),
            total
        );

        tokio::spawn(async move {
            for (index, frame) in split_frames(&audio, chunking.chunk_bytes).enumerate() {
                if !mediator.state().accepts_audio() || consumer.is_closed() {
                    debug!("[{}] Upload stopped at frame {}", session_id, index);
                    break;
                }

                let paced = async {
                    mediator.send_audio(frame.into_bytes()).await;
                    if index + 1 < total && !chunking.delay.is_zero() {
                        tokio::time::sleep(chunking.delay).await;
                    }
                };

                tokio::select! {
                    _ = paced => {}
                    _ = consumer.closed() => {
                        info!(
                            "[{}] Transcript stream dropped, upload stopped at frame {}/{}",
                            session_id,
                            index + 1,
                            total
                        );
                        break;
                    }
                }
            }
            drop(consumer);
            mediator.close().await;
        });

        Ok(ReceiverStream::new(event_rx)
            .filter(|event| futures::future::ready(event.is_final))
            .take(1)
            .boxed())
    }
}
