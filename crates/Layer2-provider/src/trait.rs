//! Provider trait and common types
//!
//! 에이전트는 LLM을 "프롬프트 문자열 → 응답 텍스트 + 토큰 사용량" 하나의 호출로만 봅니다.
//! 대화 히스토리 연결, 도구 호출 파싱은 모두 상위 레이어 몫입니다.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 생성 설정
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// 샘플링 온도
    pub temperature: f32,

    /// 최대 출력 토큰
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 8192,
        }
    }
}

/// LLM 호출 요청
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// 이어 붙인 전체 프롬프트
    pub prompt: String,

    /// 생성 설정
    pub config: GenerationConfig,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

/// Token usage for a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u64,

    /// Generated tokens
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// 제공자가 사용량을 주지 않을 때 문자 수 / 4 로 추정
    pub fn estimate(prompt: &str, output: &str) -> Self {
        Self {
            input_tokens: (prompt.chars().count() / 4) as u64,
            output_tokens: (output.chars().count() / 4) as u64,
        }
    }
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    ContentFilter,
    Other,
}

/// LLM 호출 결과
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// 응답 텍스트
    pub text: String,

    /// 토큰 사용량
    pub usage: TokenUsage,

    /// 종료 이유
    pub finish_reason: FinishReason,

    /// 실제 응답한 모델
    pub model: String,
}

/// LLM Provider trait
///
/// Implement this trait to add support for a new LLM provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider ID (e.g., "gemini")
    fn id(&self) -> &str;

    /// Current model ID
    fn model(&self) -> &str;

    /// Send the prompt and wait for the complete response
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if the provider is usable (e.g., API key is set)
    fn is_available(&self) -> bool {
        true
    }
}
