//! Error types for Lingo
//!
//! 라이브러리 crate는 모두 이 `Error`와 `Result`를 씁니다. 제공자 에러
//! (`ProviderError`)는 lingo-provider에서 이 타입으로 변환되고, HTTP 계층은
//! 여기 분류(`NotFound`, `Validation`, `TaskFinished` ...)로 상태 코드를 정합니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Lingo 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 / 저장소
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON 파일 저장소 (경로, 디렉토리 생성 등)
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // LLM 제공자
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Model not available: {0}")]
    ProviderNotFound(String),

    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 태스크
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    /// 종료된 태스크 레코드를 바꾸려 함
    #[error("Task already finished: {0}")]
    TaskFinished(String),

    // ========================================================================
    // 입력
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    /// 경로, 명령, SQL 등 도구 인자 문제
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 설정값/요청 본문 검증 실패
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 호출자가 입력을 고쳐야 하는 에러 (재시도해도 같은 결과)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidInput(_) | Error::Validation(_) | Error::TaskFinished(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::NotFound("task".into()).is_client_error());
        assert!(Error::TaskFinished("abc".into()).is_client_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
        assert!(!Error::RateLimited("slow down".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = Error::Api {
            provider: "llm".into(),
            message: "quota".into(),
        };
        assert_eq!(err.to_string(), "API error: llm - quota");
        assert_eq!(
            Error::TaskFinished("task 1 is already complete".into()).to_string(),
            "Task already finished: task 1 is already complete"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
