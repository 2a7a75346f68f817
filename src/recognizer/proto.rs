//! Wire messages of `google.cloud.speech.v1.Speech`.
//!
//! Only the fields the gateway reads or writes are declared; prost skips
//! unknown fields on decode, so the remaining ones are ignored.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognitionConfig {
    #[prost(enumeration = "AudioEncoding", tag = "1")]
    pub encoding: i32,
    #[prost(int32, tag = "2")]
    pub sample_rate_hertz: i32,
    #[prost(string, tag = "3")]
    pub language_code: ::prost::alloc::string::String,
    #[prost(int32, tag = "4")]
    pub max_alternatives: i32,
    #[prost(bool, tag = "8")]
    pub enable_word_time_offsets: bool,
    #[prost(bool, tag = "11")]
    pub enable_automatic_punctuation: bool,
    #[prost(string, tag = "13")]
    pub model: ::prost::alloc::string::String,
    #[prost(bool, tag = "14")]
    pub use_enhanced: bool,
    #[prost(string, repeated, tag = "18")]
    pub alternative_language_codes: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AudioEncoding {
    EncodingUnspecified = 0,
    Linear16 = 1,
    Flac = 2,
    Mulaw = 3,
    Amr = 4,
    AmrWb = 5,
    OggOpus = 6,
    SpeexWithHeaderByte = 7,
    Mp3 = 8,
    WebmOpus = 9,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognitionAudio {
    #[prost(oneof = "recognition_audio::AudioSource", tags = "1, 2")]
    pub audio_source: ::core::option::Option<recognition_audio::AudioSource>,
}

pub mod recognition_audio {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum AudioSource {
        #[prost(bytes, tag = "1")]
        Content(::prost::alloc::vec::Vec<u8>),
        #[prost(string, tag = "2")]
        Uri(::prost::alloc::string::String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognizeRequest {
    #[prost(message, optional, tag = "1")]
    pub config: ::core::option::Option<RecognitionConfig>,
    #[prost(message, optional, tag = "2")]
    pub audio: ::core::option::Option<RecognitionAudio>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecognizeResponse {
    #[prost(message, repeated, tag = "2")]
    pub results: ::prost::alloc::vec::Vec<SpeechRecognitionResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechRecognitionResult {
    #[prost(message, repeated, tag = "1")]
    pub alternatives: ::prost::alloc::vec::Vec<SpeechRecognitionAlternative>,
    #[prost(int32, tag = "2")]
    pub channel_tag: i32,
    #[prost(string, tag = "5")]
    pub language_code: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechRecognitionAlternative {
    #[prost(string, tag = "1")]
    pub transcript: ::prost::alloc::string::String,
    #[prost(float, tag = "2")]
    pub confidence: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognitionConfig {
    #[prost(message, optional, tag = "1")]
    pub config: ::core::option::Option<RecognitionConfig>,
    #[prost(bool, tag = "2")]
    pub single_utterance: bool,
    #[prost(bool, tag = "3")]
    pub interim_results: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognizeRequest {
    #[prost(oneof = "streaming_recognize_request::StreamingRequest", tags = "1, 2")]
    pub streaming_request: ::core::option::Option<streaming_recognize_request::StreamingRequest>,
}

pub mod streaming_recognize_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum StreamingRequest {
        #[prost(message, tag = "1")]
        StreamingConfig(super::StreamingRecognitionConfig),
        #[prost(bytes, tag = "2")]
        AudioContent(::prost::alloc::vec::Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognizeResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<Status>,
    #[prost(message, repeated, tag = "2")]
    pub results: ::prost::alloc::vec::Vec<StreamingRecognitionResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRecognitionResult {
    #[prost(message, repeated, tag = "1")]
    pub alternatives: ::prost::alloc::vec::Vec<SpeechRecognitionAlternative>,
    #[prost(bool, tag = "2")]
    pub is_final: bool,
    #[prost(float, tag = "3")]
    pub stability: f32,
}

/// `google.rpc.Status`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}
