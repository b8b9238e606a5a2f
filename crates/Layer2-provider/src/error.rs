//! Provider errors
//!
//! 제공자별 에러 본문(Gemini `status`, OpenAI `code`)은 각 제공자가 해석하고,
//! 공통 분류는 HTTP 상태 코드로 합니다. 재시도 여부는 `RetryableError`로 노출합니다.

use crate::retry::{RetryClassification, RetryableError};
use lingo_foundation::Error as FoundationError;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors that can occur during an LLM call
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key missing, invalid or without permission
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Billing quota used up; waiting does not help
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Safety/content policy block
    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    /// 5xx
    #[error("Server error: {0}")]
    ServerError(String),

    /// Connection, DNS, timeout
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Missing key or unusable client settings
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Unknown(String),
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },
            ProviderError::ServerError(_) | ProviderError::Network(_) => RetryClassification::Retry,
            _ => RetryClassification::NoRetry,
        }
    }
}

impl ProviderError {
    /// 429 with whatever retry hint the message carries
    pub fn rate_limited(message: &str) -> Self {
        ProviderError::RateLimited {
            retry_after_ms: retry_hint_ms(message),
        }
    }

    /// Fallback classification by HTTP status
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let message = message.to_string();
        match status {
            401 | 403 => ProviderError::Authentication(message),
            404 => ProviderError::ModelNotFound(message),
            408 => ProviderError::Network(message),
            413 => ProviderError::ContextLengthExceeded(message),
            429 => Self::rate_limited(&message),
            400..=499 => ProviderError::InvalidRequest(message),
            500..=599 => ProviderError::ServerError(message),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, message)),
        }
    }
}

static RETRY_HINT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"(?i)(?:try again in|retry after|retrydelay"?\s*:\s*"?)\s*([0-9]+(?:\.[0-9]+)?)\s*(ms|s)?"#,
    )
    .expect("retry hint regex")
});

/// 에러 메시지 안의 재시도 대기 시간 (ms)
///
/// OpenAI: `Please try again in 1.5s` / Gemini: `"retryDelay": "37s"`
fn retry_hint_ms(message: &str) -> Option<u64> {
    let caps = RETRY_HINT.captures(message)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "ms" => value,
        _ => value * 1000.0,
    };
    Some(millis.round() as u64)
}

// ============================================================================
// lingo_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::RateLimited { .. } | ProviderError::QuotaExceeded(_) => {
                FoundationError::RateLimited(message)
            }
            ProviderError::Network(_) => FoundationError::Http(message),
            ProviderError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
            ProviderError::ModelNotFound(msg) => FoundationError::ProviderNotFound(msg),
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::ServerError(_) => FoundationError::Api {
                provider: "llm".to_string(),
                message,
            },
            ProviderError::InvalidResponse(_) | ProviderError::Unknown(_) => {
                FoundationError::Provider(message)
            }
        }
    }
}
