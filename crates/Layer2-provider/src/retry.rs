//! Retry logic with exponential backoff
//!
//! LLM 호출만 재시도합니다. 도구 실행 실패는 관찰(Observation)로 모델에게 돌려주므로
//! 여기서 다루지 않습니다.

use lingo_foundation::ProviderSettings;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay between retries (milliseconds)
    pub initial_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,

    /// 0.8 ~ 1.2 배 지터
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// 재시도 없음
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// 제공자 설정에서 생성
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::default().with_max_retries(settings.max_retries)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);

        let delay = if self.jitter {
            capped * (0.8 + rand_jitter() * 0.4)
        } else {
            capped
        };

        Duration::from_millis(delay as u64)
    }

    /// 서버가 알려준 대기 시간도 최대 지연으로 제한
    fn rate_limit_delay(&self, retry_after_ms: u64) -> Duration {
        Duration::from_millis(retry_after_ms.min(self.max_delay_ms))
    }
}

/// Pseudo-random value in 0.0..1.0
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Transient error
    Retry,

    /// Permanent error
    NoRetry,

    /// Rate limited, use the provided delay if any
    RateLimited { retry_after_ms: Option<u64> },
}

/// Errors that can be classified for retry
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Run an async operation, retrying transient failures
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let delay = match err.classify() {
            RetryClassification::NoRetry => {
                debug!(operation = operation_name, attempt = attempt + 1, error = %err, "Non-retryable error");
                return Err(err);
            }
            RetryClassification::RateLimited {
                retry_after_ms: Some(ms),
            } => config.rate_limit_delay(ms),
            RetryClassification::RateLimited { .. } | RetryClassification::Retry => {
                config.delay_for_attempt(attempt)
            }
        };

        if attempt >= config.max_retries {
            warn!(operation = operation_name, max_retries = config.max_retries, error = %err, "Max retries exceeded");
            return Err(err);
        }

        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, retrying"
        );

        sleep(delay).await;
        attempt += 1;
    }
}
