use axum::http::StatusCode;

/// Errors surfaced by the gateway.
///
/// Display strings are the user-facing messages returned in `errorMessage`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpeechError {
    #[error("파일이 비어있습니다.")]
    EmptyInput,

    #[error(
        "파일 크기가 제한을 초과합니다. (현재: {:.2} MB, 최대: {:.2} MB)",
        megabytes(.size),
        megabytes(.max)
    )]
    TooLarge { size: u64, max: u64 },

    #[error("파일 확장자가 없습니다.")]
    MissingExtension,

    #[error("지원되지 않는 파일 형식입니다. (입력: {extension}, 지원 형식: {supported})")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("잘못된 요청 옵션입니다: {0}")]
    InvalidOptions(String),

    #[error("음성 내용을 텍스트로 변환할 수 없습니다.")]
    EmptyResult,

    #[error("음성 인식 API 호출 중 오류가 발생했습니다: {0}")]
    Recognizer(String),

    #[error("클라이언트 전송 오류: {0}")]
    Transport(String),

    #[error("이미 존재하는 세션입니다: {0}")]
    DuplicateSession(String),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

impl SpeechError {
    /// Errors raised before the recognizer is ever contacted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SpeechError::EmptyInput
                | SpeechError::TooLarge { .. }
                | SpeechError::MissingExtension
                | SpeechError::UnsupportedFormat { .. }
                | SpeechError::InvalidOptions(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SpeechError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            SpeechError::EmptyResult => StatusCode::UNPROCESSABLE_ENTITY,
            SpeechError::Recognizer(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tonic::Status> for SpeechError {
    fn from(status: tonic::Status) -> Self {
        SpeechError::Recognizer(format!("{:?}: {}", status.code(), status.message()))
    }
}
