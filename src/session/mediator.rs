// Streaming mediator
//
// Bridges one client audio stream to one duplex recognizer call:
//   OPEN --first frame--> CONFIG_SENT --close()--> CLOSING --complete--> CLOSED
// A recognizer error, a vanished request stream, or a failed delivery to the
// client moves straight to CLOSED from any state.
//
// The configuration message is only written when the first audio frame
// arrives, so the recognizer never sees a configured but idle call.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::config::MediatorConfig;
use super::events::{demultiplex, MediatorState, SessionStats, TranscriptEvent};
use crate::audio::AudioFrame;
use crate::error::SpeechError;
use crate::recognizer::{Recognizer, StreamingConfig, StreamingRequest, StreamingResponse};

/// Receives every transcript event of a session, one at a time and in order.
///
/// An `Err` means the client can no longer be reached; the mediator closes.
pub type TranscriptCallback =
    Arc<dyn Fn(TranscriptEvent) -> BoxFuture<'static, Result<(), SpeechError>> + Send + Sync>;

/// Wrap an async closure as a [`TranscriptCallback`]
pub fn transcript_callback<F, Fut>(f: F) -> TranscriptCallback
where
    F: Fn(TranscriptEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SpeechError>> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Bridges a client audio stream to a single recognizer streaming call
pub struct StreamingMediator {
    shared: Arc<Shared>,
}

struct Shared {
    session_id: String,
    created_at: DateTime<Utc>,

    /// Current lifecycle state; CLOSED is never left
    state: watch::Sender<MediatorState>,

    /// Everything that writes to the recognizer, behind one lock
    outbound: Mutex<Outbound>,

    frames_sent: AtomicUsize,
    transcripts_delivered: AtomicUsize,
}

struct Outbound {
    config: StreamingConfig,
    config_injected: bool,
    /// Dropping this half-closes the recognizer call
    requests: Option<mpsc::Sender<StreamingRequest>>,
}

impl StreamingMediator {
    /// Open the recognizer call and start relaying its responses to `on_transcript`.
    ///
    /// Nothing is written to the recognizer until the first audio frame.
    pub async fn open(
        recognizer: &dyn Recognizer,
        session_id: impl Into<String>,
        config: MediatorConfig,
        on_transcript: TranscriptCallback,
    ) -> Result<Self, SpeechError> {
        let session_id = session_id.into();
        let stream = recognizer.streaming_recognize().await?;

        info!(
            "[{}] Opened streaming call on {} ({}, {}Hz, {}, interim results: {})",
            session_id,
            recognizer.name(),
            config.recognition.encoding,
            config.recognition.sample_rate_hertz,
            config.recognition.language_code,
            config.interim_results
        );

        let (state, _) = watch::channel(MediatorState::Open);
        let shared = Arc::new(Shared {
            session_id,
            created_at: Utc::now(),
            state,
            outbound: Mutex::new(Outbound {
                config: config.streaming_config(),
                config_injected: false,
                requests: Some(stream.requests),
            }),
            frames_sent: AtomicUsize::new(0),
            transcripts_delivered: AtomicUsize::new(0),
        });

        tokio::spawn(relay_responses(
            Arc::clone(&shared),
            stream.responses,
            on_transcript,
        ));

        Ok(Self { shared })
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn state(&self) -> MediatorState {
        self.shared.state()
    }

    pub fn frames_sent(&self) -> usize {
        self.shared.frames_sent.load(Ordering::SeqCst)
    }

    pub fn transcripts_delivered(&self) -> usize {
        self.shared.transcripts_delivered.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.shared.session_id.clone(),
            state: self.state(),
            created_at: self.shared.created_at,
            frames_sent: self.frames_sent(),
            transcripts_delivered: self.transcripts_delivered(),
        }
    }

    /// Forward one audio frame.
    ///
    /// Waits while the recognizer transport applies back-pressure. Frames
    /// arriving after `close()` or after the call ended are dropped silently,
    /// as are empty frames.
    pub async fn send_audio(&self, frame: impl Into<Vec<u8>>) {
        let Some(frame) = AudioFrame::new(frame) else {
            debug!("[{}] Ignoring empty audio frame", self.shared.session_id);
            return;
        };

        let mut outbound = self.shared.outbound.lock().await;

        let state = self.shared.state();
        if !state.accepts_audio() {
            debug!(
                "[{}] Dropping {} byte frame in state {:?}",
                self.shared.session_id,
                frame.len(),
                state
            );
            return;
        }

        let Some(requests) = outbound.requests.clone() else {
            return;
        };

        if !outbound.config_injected {
            let config = StreamingRequest::Config(outbound.config.clone());
            if !self.shared.forward(&requests, config).await {
                return;
            }
            outbound.config_injected = true;
            self.shared.mark_config_sent();

            info!(
                "[{}] First audio frame received, recognizer configuration sent",
                self.shared.session_id
            );
        }

        if self
            .shared
            .forward(&requests, StreamingRequest::Audio(frame.into_bytes()))
            .await
        {
            self.shared.frames_sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Half-close the recognizer request stream. Idempotent.
    ///
    /// Responses still in flight keep being delivered until the recognizer
    /// completes, at which point the mediator is CLOSED.
    pub async fn close(&self) {
        if !self.shared.begin_closing() {
            debug!(
                "[{}] close() ignored in state {:?}",
                self.shared.session_id,
                self.shared.state()
            );
            return;
        }

        // The state flip above releases any send waiting on back-pressure,
        // so this lock is short-lived.
        let requests = self.shared.outbound.lock().await.requests.take();
        drop(requests);

        info!(
            "[{}] Request stream half-closed after {} frames",
            self.shared.session_id,
            self.frames_sent()
        );
    }

    /// Resolves once the mediator reaches CLOSED
    pub async fn closed(&self) {
        let mut state = self.shared.state.subscribe();
        let _ = state.wait_for(MediatorState::is_closed).await;
    }
}

impl Drop for StreamingMediator {
    fn drop(&mut self) {
        // A mediator dropped without close() must not leave the call open
        if self.shared.begin_closing() {
            warn!(
                "[{}] Mediator dropped while open, half-closing",
                self.shared.session_id
            );
            match self.shared.outbound.try_lock() {
                Ok(mut outbound) => {
                    outbound.requests.take();
                }
                Err(_) => match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let shared = Arc::clone(&self.shared);
                        runtime.spawn(async move {
                            shared.outbound.lock().await.requests.take();
                        });
                    }
                    Err(_) => warn!(
                        "[{}] No runtime to finish the half-close, call stays open until the recognizer ends it",
                        self.shared.session_id
                    ),
                },
            }
        }
    }
}

impl Shared {
    fn state(&self) -> MediatorState {
        *self.state.borrow()
    }

    fn mark_config_sent(&self) {
        self.state.send_if_modified(|state| {
            if *state == MediatorState::Open {
                *state = MediatorState::ConfigSent;
                true
            } else {
                false
            }
        });
    }

    /// OPEN/CONFIG_SENT -> CLOSING. Returns false when already closing or closed.
    fn begin_closing(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.accepts_audio() {
                *state = MediatorState::Closing;
                true
            } else {
                false
            }
        })
    }

    /// Any -> CLOSED. Returns false when already closed.
    fn finish(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = MediatorState::Closed;
                true
            }
        })
    }

    /// Move to CLOSED and drop the request handle
    async fn release(&self) {
        self.finish();
        self.outbound.lock().await.requests.take();
    }

    /// Write one request, giving up if the mediator stops accepting audio
    /// while waiting for capacity. Nothing is written once CLOSING or CLOSED
    /// has been observed, even when capacity and the state change arrive together.
    async fn forward(
        &self,
        requests: &mpsc::Sender<StreamingRequest>,
        request: StreamingRequest,
    ) -> bool {
        let mut state = self.state.subscribe();

        tokio::select! {
            biased;
            permit = requests.reserve() => match permit {
                Ok(permit) => {
                    if !self.state().accepts_audio() {
                        debug!("[{}] Send abandoned, mediator is closing", self.session_id);
                        return false;
                    }
                    permit.send(request);
                    true
                }
                Err(_) => {
                    warn!(
                        "[{}] Recognizer request stream is gone, closing session",
                        self.session_id
                    );
                    self.finish();
                    false
                }
            },
            _ = state.wait_for(|s| !s.accepts_audio()) => {
                debug!("[{}] Send abandoned, mediator is closing", self.session_id);
                false
            }
        }
    }
}

/// Drain recognizer responses and hand each transcript to the client
async fn relay_responses(
    shared: Arc<Shared>,
    mut responses: mpsc::Receiver<Result<StreamingResponse, SpeechError>>,
    on_transcript: TranscriptCallback,
) {
    while let Some(item) = responses.recv().await {
        let response = match item {
            Ok(response) => response,
            Err(e) => {
                error!("[{}] Recognizer error: {}", shared.session_id, e);
                shared.release().await;
                return;
            }
        };

        for event in demultiplex(response) {
            if shared.state().is_closed() {
                return;
            }

            debug!(
                "[{}] Transcript: {} (final: {})",
                shared.session_id, event.text, event.is_final
            );

            if let Err(e) = on_transcript(event).await {
                warn!(
                    "[{}] Failed to deliver transcript, closing session: {}",
                    shared.session_id, e
                );
                shared.release().await;
                return;
            }
            shared.transcripts_delivered.fetch_add(1, Ordering::SeqCst);
        }
    }

    info!(
        "[{}] Recognizer stream completed ({} transcripts delivered)",
        shared.session_id,
        shared.transcripts_delivered.load(Ordering::SeqCst)
    );
    shared.release().await;
}
