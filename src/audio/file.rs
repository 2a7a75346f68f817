use tracing::{info, warn};

use super::encoding::{self, AudioEncoding};
use crate::config::SttConfig;
use crate::error::SpeechError;

/// An uploaded audio file, held in memory for the duration of one request
#[derive(Debug, Clone, Default)]
pub struct AudioUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(filename: Option<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> &str {
        self.filename
            .as_deref()
            .map(encoding::file_extension)
            .unwrap_or_default()
    }

    pub fn encoding(&self) -> AudioEncoding {
        encoding::resolve(self.content_type.as_deref(), self.filename.as_deref())
    }
}

/// Rejects uploads that must never reach the recognizer
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_bytes: u64,
    supported_formats: Vec<String>,
}

impl FileValidator {
    pub fn new(max_bytes: u64, supported_formats: Vec<String>) -> Self {
        let supported_formats = supported_formats
            .into_iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();

        Self {
            max_bytes,
            supported_formats,
        }
    }

    pub fn from_config(config: &SttConfig) -> Self {
        let validator = Self::new(config.max_file_size_bytes(), config.supported_formats());
        info!(
            "File validator initialized: max {} MB, formats [{}]",
            config.max_file_size_mb,
            validator.supported_formats.join(",")
        );
        validator
    }

    pub fn validate(&self, upload: &AudioUpload) -> Result<(), SpeechError> {
        let result = self.check(upload);
        if let Err(e) = &result {
            warn!("Rejected upload {:?}: {}", upload.filename, e);
        }
        result
    }

    fn check(&self, upload: &AudioUpload) -> Result<(), SpeechError> {
        if upload.bytes.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        if upload.size() > self.max_bytes {
            return Err(SpeechError::TooLarge {
                size: upload.size(),
                max: self.max_bytes,
            });
        }

        let extension = upload.extension().to_lowercase();
        if extension.is_empty() {
            return Err(SpeechError::MissingExtension);
        }

        if !self.supported_formats.iter().any(|f| *f == extension) {
            return Err(SpeechError::UnsupportedFormat {
                extension,
                supported: self.supported_formats.join(","),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FileValidator {
        FileValidator::new(
            1024,
            vec!["mp3".into(), "WAV".into(), " flac ".into(), "ogg".into(), "m4a".into()],
        )
    }

    fn upload(name: &str, len: usize) -> AudioUpload {
        AudioUpload::new(Some(name.to_string()), None, vec![1u8; len])
    }

    #[test]
    fn test_accepts_supported_file() {
        assert!(validator().validate(&upload("hello.wav", 10)).is_ok());
        assert!(validator().validate(&upload("HELLO.FLAC", 10)).is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            validator().validate(&upload("hello.wav", 0)),
            Err(SpeechError::EmptyInput)
        );
    }

    #[test]
    fn test_rejects_oversized() {
        assert_eq!(
            validator().validate(&upload("hello.wav", 1025)),
            Err(SpeechError::TooLarge {
                size: 1025,
                max: 1024
            })
        );
        // Exactly at the limit is allowed
        assert!(validator().validate(&upload("hello.wav", 1024)).is_ok());
    }

    #[test]
    fn test_rejects_missing_extension() {
        assert_eq!(
            validator().validate(&upload("recording", 10)),
            Err(SpeechError::MissingExtension)
        );
        assert_eq!(
            validator().validate(&upload("recording.", 10)),
            Err(SpeechError::MissingExtension)
        );
        let nameless = AudioUpload::new(None, Some("audio/wav".into()), vec![1; 10]);
        assert_eq!(
            validator().validate(&nameless),
            Err(SpeechError::MissingExtension)
        );
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        match validator().validate(&upload("notes.txt", 10)) {
            Err(SpeechError::UnsupportedFormat {
                extension,
                supported,
            }) => {
                assert_eq!(extension, "txt");
                assert_eq!(supported, "mp3,wav,flac,ogg,m4a");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
