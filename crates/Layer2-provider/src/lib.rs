//! # lingo-provider
//!
//! LLM provider abstraction layer for Lingo.
//!
//! 에이전트 루프는 제공자를 "프롬프트 → 텍스트" 한 번의 호출로 사용합니다.
//!
//! ## Features
//! - Gemini (generateContent), OpenAI 및 호환 엔드포인트
//! - Automatic retry with exponential backoff
//! - 테스트/오프라인용 ScriptedProvider

pub mod error;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use r#trait::{
    CompletionRequest, CompletionResponse, FinishReason, GenerationConfig, Provider, TokenUsage,
};

// Error and retry
pub use error::ProviderError;
pub use retry::{with_retry, RetryConfig};

// Provider implementations
pub use providers::create_provider;
pub use providers::gemini::GeminiProvider;
pub use providers::openai::OpenAiProvider;
pub use providers::scripted::{ScriptStep, ScriptedProvider};
