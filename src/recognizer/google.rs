use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, error, info};

use super::proto::{self, recognition_audio, streaming_recognize_request};
use super::{
    Alternative, RecognitionResult, Recognizer, RecognizerConfig, RecognizerStream,
    StreamingRequest, StreamingResponse, StreamingResult,
};
use crate::audio::AudioEncoding;
use crate::config::RecognizerSettings;
use crate::error::SpeechError;

const RECOGNIZE_PATH: &str = "/google.cloud.speech.v1.Speech/Recognize";
const STREAMING_RECOGNIZE_PATH: &str = "/google.cloud.speech.v1.Speech/StreamingRecognize";

#[derive(Clone)]
enum Credentials {
    Anonymous,
    ApiKey(MetadataValue<Ascii>),
    Bearer(MetadataValue<Ascii>),
}

impl Credentials {
    fn load(settings: &RecognizerSettings) -> Result<Self> {
        if let Some(path) = settings.credentials_path.as_deref() {
            let path = shellexpand::tilde(path).into_owned();
            let token = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read recognizer credentials: {}", path))?;
            let value = MetadataValue::try_from(format!("Bearer {}", token.trim()))
                .context("Access token is not valid header text")?;
            info!("Using access token credentials from {}", path);
            return Ok(Credentials::Bearer(value));
        }

        if let Some(key) = settings.api_key.as_deref() {
            let value = MetadataValue::try_from(key.trim().to_string())
                .context("API key is not valid header text")?;
            info!("Using API key credentials");
            return Ok(Credentials::ApiKey(value));
        }

        info!("No recognizer credentials configured");
        Ok(Credentials::Anonymous)
    }

    fn apply<T>(&self, request: &mut tonic::Request<T>) {
        match self {
            Credentials::Anonymous => {}
            Credentials::ApiKey(value) => {
                request.metadata_mut().insert("x-goog-api-key", value.clone());
            }
            Credentials::Bearer(value) => {
                request.metadata_mut().insert("authorization", value.clone());
            }
        }
    }
}

/// `google.cloud.speech.v1.Speech` over gRPC
///
/// The channel connects lazily and is shared by every call.
pub struct GoogleSpeechClient {
    channel: Channel,
    credentials: Credentials,
    request_buffer: usize,
}

impl GoogleSpeechClient {
    pub fn from_settings(settings: &RecognizerSettings) -> Result<Self> {
        let mut endpoint = Endpoint::from_shared(settings.endpoint.clone())
            .with_context(|| format!("Invalid recognizer endpoint '{}'", settings.endpoint))?;

        if settings.endpoint.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .context("Failed to configure TLS for recognizer endpoint")?;
        }

        let client = Self {
            channel: endpoint.connect_lazy(),
            credentials: Credentials::load(settings)?,
            request_buffer: settings.request_buffer.max(1),
        };

        info!("Recognizer client ready for {}", settings.endpoint);

        Ok(client)
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        self.credentials.apply(&mut request);
        request
    }
}

async fn ready(channel: Channel) -> Result<Grpc<Channel>, SpeechError> {
    let mut grpc = Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|e| SpeechError::Recognizer(format!("Service was not ready: {}", e)))?;
    Ok(grpc)
}

#[async_trait]
impl Recognizer for GoogleSpeechClient {
    async fn recognize(
        &self,
        config: &RecognizerConfig,
        audio: Vec<u8>,
    ) -> Result<Vec<RecognitionResult>, SpeechError> {
        debug!(
            "Recognize call - language: {}, model: {}, bytes: {}",
            config.language_code,
            config.model,
            audio.len()
        );

        let message = proto::RecognizeRequest {
            config: Some(config.into()),
            audio: Some(proto::RecognitionAudio {
                audio_source: Some(recognition_audio::AudioSource::Content(audio)),
            }),
        };

        let codec: ProstCodec<proto::RecognizeRequest, proto::RecognizeResponse> =
            ProstCodec::default();
        let response = ready(self.channel.clone())
            .await?
            .unary(
                self.request(message),
                PathAndQuery::from_static(RECOGNIZE_PATH),
                codec,
            )
            .await?;

        Ok(response
            .into_inner()
            .results
            .into_iter()
            .map(RecognitionResult::from)
            .collect())
    }

    async fn streaming_recognize(&self) -> Result<RecognizerStream, SpeechError> {
        let (request_tx, request_rx) = mpsc::channel::<StreamingRequest>(self.request_buffer);
        let (response_tx, response_rx) = mpsc::channel(self.request_buffer);

        let outbound = ReceiverStream::new(request_rx).map(proto::StreamingRecognizeRequest::from);
        let request = self.request(outbound);
        let channel = self.channel.clone();

        // The call is driven from its own task so that opening never waits on
        // the server, which only answers once the first message arrives.
        tokio::spawn(async move {
            let codec: ProstCodec<
                proto::StreamingRecognizeRequest,
                proto::StreamingRecognizeResponse,
            > = ProstCodec::default();

            let call = match ready(channel).await {
                Ok(mut grpc) => grpc
                    .streaming(request, PathAndQuery::from_static(STREAMING_RECOGNIZE_PATH), codec)
                    .await
                    .map_err(SpeechError::from),
                Err(e) => Err(e),
            };

            let mut inbound = match call {
                Ok(response) => response.into_inner(),
                Err(e) => {
                    error!("StreamingRecognize call failed: {}", e);
                    let _ = response_tx.send(Err(e)).await;
                    return;
                }
            };

            loop {
                let item = match inbound.message().await {
                    Ok(Some(message)) => StreamingResponse::try_from(message),
                    Ok(None) => {
                        debug!("StreamingRecognize completed");
                        break;
                    }
                    Err(status) => Err(SpeechError::from(status)),
                };

                let failed = item.is_err();
                if response_tx.send(item).await.is_err() {
                    debug!("Streaming response receiver dropped, cancelling call");
                    break;
                }
                if failed {
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
        "google-speech-v1"
    }
}

// ============================================================================
// Domain <-> wire conversions
// ============================================================================

impl From<AudioEncoding> for proto::AudioEncoding {
    fn from(encoding: AudioEncoding) -> Self {
        match encoding.concrete() {
            AudioEncoding::Linear16 | AudioEncoding::Unknown => proto::AudioEncoding::Linear16,
            AudioEncoding::Flac => proto::AudioEncoding::Flac,
            AudioEncoding::Mp3 => proto::AudioEncoding::Mp3,
            AudioEncoding::OggOpus => proto::AudioEncoding::OggOpus,
            AudioEncoding::WebmOpus => proto::AudioEncoding::WebmOpus,
        }
    }
}

impl From<&RecognizerConfig> for proto::RecognitionConfig {
    fn from(config: &RecognizerConfig) -> Self {
        proto::RecognitionConfig {
            encoding: proto::AudioEncoding::from(config.encoding) as i32,
            sample_rate_hertz: config.sample_rate_hertz as i32,
            language_code: config.language_code.clone(),
            max_alternatives: 1,
            enable_word_time_offsets: config.enable_word_time_offsets,
            enable_automatic_punctuation: config.enable_automatic_punctuation,
            model: config.model.clone(),
            use_enhanced: config.use_enhanced,
            alternative_language_codes: config.alternative_language_codes.clone(),
        }
    }
}

impl From<StreamingRequest> for proto::StreamingRecognizeRequest {
    fn from(request: StreamingRequest) -> Self {
        let streaming_request = match request {
            StreamingRequest::Config(streaming) => {
                streaming_recognize_request::StreamingRequest::StreamingConfig(
                    proto::StreamingRecognitionConfig {
                        config: Some((&streaming.config).into()),
                        single_utterance: false,
                        interim_results: streaming.interim_results,
                    },
                )
            }
            StreamingRequest::Audio(bytes) => {
                streaming_recognize_request::StreamingRequest::AudioContent(bytes)
            }
        };

        proto::StreamingRecognizeRequest {
            streaming_request: Some(streaming_request),
        }
    }
}

impl From<proto::SpeechRecognitionAlternative> for Alternative {
    fn from(alternative: proto::SpeechRecognitionAlternative) -> Self {
        Alternative {
            transcript: alternative.transcript,
            confidence: alternative.confidence,
        }
    }
}

impl From<proto::SpeechRecognitionResult> for RecognitionResult {
    fn from(result: proto::SpeechRecognitionResult) -> Self {
        RecognitionResult {
            alternatives: result.alternatives.into_iter().map(Alternative::from).collect(),
        }
    }
}

impl TryFrom<proto::StreamingRecognizeResponse> for StreamingResponse {
    type Error = SpeechError;

    fn try_from(response: proto::StreamingRecognizeResponse) -> Result<Self, Self::Error> {
        if let Some(status) = response.error.filter(|s| s.code != 0) {
            return Err(SpeechError::Recognizer(format!(
                "code {}: {}",
                status.code, status.message
            )));
        }

        Ok(StreamingResponse {
            results: response
                .results
                .into_iter()
                .map(|result| StreamingResult {
                    alternatives: result.alternatives.into_iter().map(Alternative::from).collect(),
                    is_final: result.is_final,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::StreamingConfig;

    fn linear16_config() -> RecognizerConfig {
        RecognizerConfig::build(AudioEncoding::Linear16, "ko-KR", true, false, vec!["en-US".into()])
    }

    #[test]
    fn test_recognition_config_mapping() {
        let wire = proto::RecognitionConfig::from(&linear16_config());

        assert_eq!(wire.encoding, proto::AudioEncoding::Linear16 as i32);
        assert_eq!(wire.sample_rate_hertz, 48_000);
        assert_eq!(wire.language_code, "ko-KR");
        assert_eq!(wire.model, "latest_long");
        assert!(wire.use_enhanced);
        assert!(wire.enable_automatic_punctuation);
        assert_eq!(wire.alternative_language_codes, vec!["en-US".to_string()]);
    }

    #[test]
    fn test_config_request_carries_no_audio() {
        let request = proto::StreamingRecognizeRequest::from(StreamingRequest::Config(
            StreamingConfig {
                config: linear16_config(),
                interim_results: true,
            },
        ));

        match request.streaming_request {
            Some(streaming_recognize_request::StreamingRequest::StreamingConfig(cfg)) => {
                assert!(cfg.interim_results);
                assert!(!cfg.single_utterance);
                assert!(cfg.config.is_some());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_audio_request_carries_no_config() {
        let request =
            proto::StreamingRecognizeRequest::from(StreamingRequest::Audio(vec![1, 2, 3]));

        assert_eq!(
            request.streaming_request,
            Some(streaming_recognize_request::StreamingRequest::AudioContent(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_error_status_becomes_recognizer_error() {
        let response = proto::StreamingRecognizeResponse {
            error: Some(proto::Status {
                code: 11,
                message: "Audio Timeout Error".to_string(),
            }),
            results: vec![],
        };

        match StreamingResponse::try_from(response) {
            Err(SpeechError::Recognizer(msg)) => assert!(msg.contains("Audio Timeout Error")),
            other => panic!("unexpected conversion: {:?}", other),
        }
    }

    #[test]
    fn test_ok_status_is_ignored() {
        let response = proto::StreamingRecognizeResponse {
            error: Some(proto::Status {
                code: 0,
                message: String::new(),
            }),
            results: vec![proto::StreamingRecognitionResult {
                alternatives: vec![proto::SpeechRecognitionAlternative {
                    transcript: "foo".to_string(),
                    confidence: 0.0,
                }],
                is_final: true,
                stability: 0.0,
            }],
        };

        let converted = StreamingResponse::try_from(response).unwrap();
        assert_eq!(converted.results.len(), 1);
        assert!(converted.results[0].is_final);
        assert_eq!(converted.results[0].alternatives[0].transcript, "foo");
    }
}
