//! Scripted provider
//!
//! 미리 정해 둔 응답을 순서대로 돌려주는 오프라인 제공자입니다.
//! 에이전트와 서버 테스트에서 사용합니다.

use crate::{
    error::ProviderError,
    r#trait::{CompletionRequest, CompletionResponse, FinishReason, Provider, TokenUsage},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 스크립트 한 단계
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// 텍스트 응답
    Reply(String),
    /// 호출 실패
    Fail(ProviderError),
}

/// Replays canned responses in order
#[derive(Clone)]
pub struct ScriptedProvider {
    model: String,
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: "scripted".to_string(),
            steps: Arc::new(Mutex::new(
                replies
                    .into_iter()
                    .map(|r| ScriptStep::Reply(r.into()))
                    .collect(),
            )),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// 응답마다 지연 (취소 테스트용)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, step: ScriptStep) {
        self.steps.lock().push_back(step);
    }

    /// 지금까지 받은 프롬프트
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.prompts.lock().push(request.prompt.clone());
        let step = self.steps.lock().pop_front();

        match step {
            Some(ScriptStep::Reply(text)) => Ok(CompletionResponse {
                usage: TokenUsage::estimate(&request.prompt, &text),
                text,
                finish_reason: FinishReason::Stop,
                model: self.model.clone(),
            }),
            Some(ScriptStep::Fail(err)) => Err(err),
            None => Err(ProviderError::Unknown("script exhausted".to_string())),
        }
    }
}
