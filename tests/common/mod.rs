// Test doubles for the recognizer
//
// - MockRecognizer hands every streaming call to the test, which drives both
//   directions by hand.
// - ScriptedRecognizer answers on its own: it records requests until the
//   client half-closes, then replays a fixed list of responses and completes.

#![allow(dead_code)]

use async_trait::async_trait;
use speech_gateway::error::SpeechError;
use speech_gateway::recognizer::{
    Alternative, RecognitionResult, Recognizer, RecognizerConfig, RecognizerStream,
    StreamingRequest, StreamingResponse, StreamingResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Server side of one streaming call
pub struct MockCall {
    pub requests: mpsc::Receiver<StreamingRequest>,
    pub responses: mpsc::Sender<Result<StreamingResponse, SpeechError>>,
}

impl MockCall {
    /// Next request, or `None` once the client half-closed
    pub async fn next_request(&mut self) -> Option<StreamingRequest> {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for a request")
    }

    /// Collect requests until the client half-closes
    pub async fn drain(&mut self) -> Vec<StreamingRequest> {
        let mut requests = Vec::new();
        while let Some(request) = self.next_request().await {
            requests.push(request);
        }
        requests
    }

    pub async fn respond(&self, response: StreamingResponse) {
        self.responses
            .send(Ok(response))
            .await
            .expect("mediator dropped the response channel");
    }

    pub async fn fail(&self, message: &str) {
        let _ = self
            .responses
            .send(Err(SpeechError::Recognizer(message.to_string())))
            .await;
    }

    /// Complete the call
    pub fn complete(self) {}
}

pub struct MockRecognizer {
    calls: mpsc::UnboundedSender<MockCall>,
    request_buffer: usize,
}

impl MockRecognizer {
    pub fn new(request_buffer: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<MockCall>) {
        let (calls, calls_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls,
                request_buffer,
            }),
            calls_rx,
        )
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn recognize(
        &self,
        _config: &RecognizerConfig,
        _audio: Vec<u8>,
    ) -> Result<Vec<RecognitionResult>, SpeechError> {
        Err(SpeechError::Recognizer("unary calls are not mocked".to_string()))
    }

    async fn streaming_recognize(&self) -> Result<RecognizerStream, SpeechError> {
        let (request_tx, request_rx) = mpsc::channel(self.request_buffer);
        let (response_tx, response_rx) = mpsc::channel(16);

        self.calls
            .send(MockCall {
                requests: request_rx,
                responses: response_tx,
            })
            .map_err(|_| SpeechError::Recognizer("mock is gone".to_string()))?;

        Ok(RecognizerStream {
            requests: request_tx,
            responses: response_rx,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub struct ScriptedRecognizer {
    unary: Result<Vec<RecognitionResult>, SpeechError>,
    streaming: Vec<StreamingResponse>,
    pub recognize_calls: AtomicUsize,
    pub streaming_calls: AtomicUsize,
    last_config: Mutex<Option<RecognizerConfig>>,
    recorded: Arc<Mutex<Vec<Vec<StreamingRequest>>>>,
}

impl ScriptedRecognizer {
    pub fn new(
        unary: Result<Vec<RecognitionResult>, SpeechError>,
        streaming: Vec<StreamingResponse>,
    ) -> Arc<Self> {
        Arc::new(Self {
            unary,
            streaming,
            recognize_calls: AtomicUsize::new(0),
            streaming_calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            recorded: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn calls(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst) + self.streaming_calls.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<RecognizerConfig> {
        self.last_config.lock().unwrap().clone()
    }

    /// Requests of every finished streaming call, in call order
    pub fn recorded(&self) -> Vec<Vec<StreamingRequest>> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        config: &RecognizerConfig,
        _audio: Vec<u8>,
    ) -> Result<Vec<RecognitionResult>, SpeechError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        self.unary.clone()
    }

    async fn streaming_recognize(&self) -> Result<RecognizerStream, SpeechError> {
        self.streaming_calls.fetch_add(1, Ordering::SeqCst);

        let (request_tx, mut request_rx) = mpsc::channel(32);
        let (response_tx, response_rx) = mpsc::channel(16);
        let script = self.streaming.clone();
        let recorded = Arc::clone(&self.recorded);

        tokio::spawn(async move {
            let mut requests = Vec::new();
            while let Some(request) = request_rx.recv().await {
                requests.push(request);
            }
            recorded.lock().unwrap().push(requests);

            for response in script {
                if response_tx.send(Ok(response)).await.is_err() {
                    break;
                }
            }
        });

        Ok(RecognizerStream {
            requests: request_tx,
            responses: response_rx,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn alternative(transcript: &str, confidence: f32) -> Alternative {
    Alternative {
        transcript: transcript.to_string(),
        confidence,
    }
}

pub fn unary_result(transcript: &str, confidence: f32) -> RecognitionResult {
    RecognitionResult {
        alternatives: vec![alternative(transcript, confidence)],
    }
}

/// A response holding a single result
pub fn transcript(text: &str, is_final: bool) -> StreamingResponse {
    StreamingResponse {
        results: vec![StreamingResult {
            alternatives: vec![alternative(text, if is_final { 0.9 } else { 0.0 })],
            is_final,
        }],
    }
}

/// 16-bit mono PCM WAV of roughly `target_bytes`
pub fn wav_bytes(target_bytes: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..target_bytes / 2 {
            let t = i as f32 / 48_000.0;
            let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8_000.0;
            writer.write_sample(sample as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub const BOUNDARY: &str = "speech-gateway-test-boundary";

/// multipart/form-data body with an optional file part and text fields
pub fn multipart_body(
    file: Option<(&str, &str, &[u8])>,
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
