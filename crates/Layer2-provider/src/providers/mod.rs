//! LLM Provider implementations

pub mod gemini;
pub mod openai;
pub mod scripted;

use crate::{error::ProviderError, retry::RetryConfig, Provider};
use lingo_foundation::{ProviderKind, ProviderSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 설정에서 제공자 생성
///
/// API 키가 없으면 `NotConfigured`. OpenAI 호환 엔드포인트(`base_url`)는 키 없이 허용합니다.
pub fn create_provider(
    settings: &ProviderSettings,
    model: &str,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = settings.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(settings.timeout_secs);
    let retry = RetryConfig::from_settings(settings);

    let provider: Arc<dyn Provider> = match settings.kind {
        ProviderKind::Gemini => {
            if api_key.is_empty() {
                return Err(ProviderError::NotConfigured(format!(
                    "{} is not set",
                    settings.kind.api_key_env()
                )));
            }
            let mut provider = gemini::GeminiProvider::new(api_key, model)?
                .with_timeout(timeout)?
                .with_retry(retry);
            if let Some(ref url) = settings.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::Openai => {
            let mut provider = openai::OpenAiProvider::new(api_key, model)?
                .with_timeout(timeout)?
                .with_retry(retry);
            if let Some(ref url) = settings.base_url {
                provider = provider.with_base_url(url.clone());
            }
            if !provider.is_available() {
                return Err(ProviderError::NotConfigured(format!(
                    "{} is not set",
                    settings.kind.api_key_env()
                )));
            }
            Arc::new(provider)
        }
    };

    info!(provider = provider.id(), model, "Provider ready");
    Ok(provider)
}
