use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `SPEECH_GATEWAY__STT__MAX_FILE_SIZE_MB=20`
pub const ENV_PREFIX: &str = "SPEECH_GATEWAY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub stt: SttConfig,
    pub recognizer: RecognizerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    pub max_file_size_mb: u64,
    /// Comma separated extension allowlist
    pub supported_formats: String,
    pub default_language_code: String,
    /// Comma separated, at most three
    pub alternative_language_codes: String,
    pub stream_chunk_bytes: usize,
    pub stream_chunk_delay_ms: u64,
    pub ws_interim_results: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// File holding an OAuth access token
    pub credentials_path: Option<String>,
    /// Capacity of the per-session request channel
    pub request_buffer: usize,
}

impl Config {
    /// Load configuration: defaults, then the optional file at `path`, then environment.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    /// Defaults only, no file or environment lookup.
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "speech-gateway")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8080)?
            .set_default("stt.max_file_size_mb", 10)?
            .set_default("stt.supported_formats", "mp3,wav,flac,ogg,m4a")?
            .set_default("stt.default_language_code", "ko-KR")?
            .set_default("stt.alternative_language_codes", "")?
            .set_default("stt.stream_chunk_bytes", 8192)?
            .set_default("stt.stream_chunk_delay_ms", 50)?
            .set_default("stt.ws_interim_results", true)?
            .set_default("recognizer.endpoint", "https://speech.googleapis.com")?
            .set_default("recognizer.request_buffer", 32)?)
    }
}

impl SttConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn supported_formats(&self) -> Vec<String> {
        split_list(&self.supported_formats)
            .into_iter()
            .map(|f| f.to_lowercase())
            .collect()
    }

    pub fn alternative_language_codes(&self) -> Vec<String> {
        split_list(&self.alternative_language_codes)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
