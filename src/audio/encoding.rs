// Audio encoding resolution
//
// Maps an upload's MIME type, or failing that its filename extension, onto
// the encoding tag the recognizer expects. The resolver is total: callers
// always get a concrete encoding back.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Encodings understood by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Linear16,
    Flac,
    Mp3,
    OggOpus,
    WebmOpus,
    Unknown,
}

impl AudioEncoding {
    /// Replace `Unknown` with the default encoding
    pub fn concrete(self) -> Self {
        match self {
            AudioEncoding::Unknown => AudioEncoding::Linear16,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::Flac => "FLAC",
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::WebmOpus => "WEBM_OPUS",
            AudioEncoding::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the encoding of an upload. Never returns `Unknown`.
pub fn resolve(content_type: Option<&str>, filename: Option<&str>) -> AudioEncoding {
    debug!(
        "Resolving audio encoding - content type: {:?}, filename: {:?}",
        content_type, filename
    );

    if let Some(encoding) = content_type.and_then(encoding_for_content_type) {
        return encoding;
    }

    if let Some(encoding) = filename
        .map(file_extension)
        .and_then(encoding_for_extension)
    {
        return encoding;
    }

    warn!(
        "Could not determine audio encoding, falling back to LINEAR16 (content type: {:?}, filename: {:?})",
        content_type, filename
    );
    AudioEncoding::Unknown.concrete()
}

/// Substring after the last `.`; empty when there is no dot or it is the last character.
pub fn file_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() => &filename[idx + 1..],
        _ => "",
    }
}

fn encoding_for_content_type(content_type: &str) -> Option<AudioEncoding> {
    // Parameters such as `audio/ogg; codecs=opus` do not affect the mapping
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some(AudioEncoding::Linear16),
        "audio/flac" | "audio/x-flac" => Some(AudioEncoding::Flac),
        "audio/ogg" => Some(AudioEncoding::OggOpus),
        "audio/mp3" | "audio/mpeg" => Some(AudioEncoding::Mp3),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some(AudioEncoding::WebmOpus),
        _ => None,
    }
}

fn encoding_for_extension(extension: &str) -> Option<AudioEncoding> {
    match extension.to_ascii_lowercase().as_str() {
        "wav" => Some(AudioEncoding::Linear16),
        "flac" => Some(AudioEncoding::Flac),
        "ogg" => Some(AudioEncoding::OggOpus),
        "mp3" => Some(AudioEncoding::Mp3),
        "m4a" | "mp4" => Some(AudioEncoding::WebmOpus),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_wins_over_filename() {
        assert_eq!(
            resolve(Some("audio/flac"), Some("speech.mp3")),
            AudioEncoding::Flac
        );
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        assert_eq!(resolve(Some("AUDIO/WAV"), None), AudioEncoding::Linear16);
        assert_eq!(resolve(Some("Audio/X-Wav"), None), AudioEncoding::Linear16);
        assert_eq!(resolve(Some("audio/MPEG"), None), AudioEncoding::Mp3);
    }

    #[test]
    fn test_ogg_with_parameters() {
        assert_eq!(
            resolve(Some("audio/ogg; codecs=opus"), None),
            AudioEncoding::OggOpus
        );
    }

    #[test]
    fn test_m4a_maps_to_webm_opus() {
        assert_eq!(resolve(Some("audio/mp4"), None), AudioEncoding::WebmOpus);
        assert_eq!(resolve(Some("audio/x-m4a"), None), AudioEncoding::WebmOpus);
        assert_eq!(resolve(None, Some("memo.M4A")), AudioEncoding::WebmOpus);
    }

    #[test]
    fn test_unrecognized_content_type_falls_back_to_extension() {
        assert_eq!(
            resolve(Some("application/octet-stream"), Some("take.flac")),
            AudioEncoding::Flac
        );
    }

    #[test]
    fn test_default_is_linear16() {
        assert_eq!(resolve(None, None), AudioEncoding::Linear16);
        assert_eq!(resolve(None, Some("noextension")), AudioEncoding::Linear16);
        assert_eq!(resolve(Some("text/plain"), Some("notes.txt")), AudioEncoding::Linear16);
    }

    #[test]
    fn test_resolver_never_returns_unknown() {
        let content_types = [None, Some(""), Some("audio/ogg"), Some("video/webm"), Some(";")];
        let filenames = [None, Some(""), Some("."), Some("a."), Some("a.wav"), Some("a.b.c")];

        for ct in content_types {
            for name in filenames {
                assert_ne!(resolve(ct, name), AudioEncoding::Unknown, "{:?} {:?}", ct, name);
            }
        }
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("hello.wav"), "wav");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("trailing."), "");
        assert_eq!(file_extension("none"), "");
        assert_eq!(file_extension(""), "");
    }
}
