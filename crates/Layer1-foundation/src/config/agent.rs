//! Agent Settings - 에이전트 실행 설정
//!
//! 태스크마다 한 벌씩 저장되며, 태스크 생성 요청의 부분 설정(`AgentOverrides`)이
//! 서버 기본값 위에 덮어써집니다.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// CompactionSettings
// ============================================================================

/// 컨텍스트 압축 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompactionSettings {
    /// 압축을 고려할 최소 턴 수 (시스템 프롬프트 제외)
    pub min_turns: usize,

    /// 압축 시작 토큰 추정치 (문자 수 / 4)
    pub token_threshold: usize,

    /// 그대로 유지할 최근 요청/응답 쌍 수
    pub keep_recent_pairs: usize,

    /// 요약 입력에서 턴 하나당 최대 문자 수
    pub max_turn_chars: usize,

    /// 목표 압축 비율 (0.0 ~ 1.0)
    pub target_ratio: f32,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            min_turns: 12,
            token_threshold: 50_000,
            keep_recent_pairs: 3,
            max_turn_chars: 2_000,
            target_ratio: 0.3,
        }
    }
}

impl CompactionSettings {
    /// 유지되는 최근 턴 수
    pub fn keep_recent_turns(&self) -> usize {
        self.keep_recent_pairs * 2
    }

    /// 실제로 적용되는 최소 턴 수
    ///
    /// 압축 직후의 히스토리(요약 + 계획 데이터 + 최근 턴)는 항상 이 값보다 짧습니다.
    pub fn effective_min_turns(&self) -> usize {
        self.min_turns.max(self.keep_recent_turns() + 3)
    }
}

// ============================================================================
// AgentSettings
// ============================================================================

/// 에이전트 실행 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// 모델 ID
    pub model: String,

    /// 최대 반복 횟수
    pub max_iterations: u32,

    /// 샘플링 온도
    pub temperature: f32,

    /// 최대 출력 토큰
    pub max_output_tokens: u32,

    /// N번째 도구 반복마다 회고 프롬프트 주입
    pub reflection_interval: u32,

    /// 종료 검증을 요청하려면 남아 있어야 하는 반복 수
    pub finish_verification_margin: u32,

    /// 컨텍스트 압축
    pub compaction: CompactionSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_iterations: 30,
            temperature: 0.7,
            max_output_tokens: 8192,
            reflection_interval: 3,
            finish_verification_margin: 1,
            compaction: CompactionSettings::default(),
        }
    }
}

impl AgentSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_compaction(mut self, compaction: CompactionSettings) -> Self {
        self.compaction = compaction;
        self
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Validation("model must not be empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::Validation("maxIterations must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Validation(format!(
                "temperature {} out of range 0.0..=2.0",
                self.temperature
            )));
        }
        if self.reflection_interval == 0 {
            return Err(Error::Validation(
                "reflectionInterval must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.compaction.target_ratio) {
            return Err(Error::Validation(
                "compaction.targetRatio must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// AgentOverrides
// ============================================================================

/// 태스크 생성 시 넘어오는 부분 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionSettings>,
}

impl AgentOverrides {
    /// 기본 설정 위에 덮어쓴 결과
    pub fn apply(&self, base: &AgentSettings) -> AgentSettings {
        let mut settings = base.clone();
        if let Some(ref model) = self.model {
            settings.model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            settings.max_iterations = max;
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(tokens) = self.max_output_tokens {
            settings.max_output_tokens = tokens;
        }
        if let Some(ref compaction) = self.compaction {
            settings.compaction = compaction.clone();
        }
        settings
    }
}
