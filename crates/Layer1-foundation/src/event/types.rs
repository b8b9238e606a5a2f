//! Event Types - 에이전트 상태 이벤트 정의
//!
//! 에이전트 루프의 모든 상태 전이는 `StatusEvent` 하나로 보고됩니다.
//! 태스크 저장소와 SSE 스트림은 이 이벤트만 보고 진행 상황을 알 수 있습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// 새 이벤트 ID 생성
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Type
// ============================================================================

/// 상태 이벤트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEventType {
    /// 실행 시작
    Start,
    /// 새 반복 시작
    Iteration,
    /// 도구 호출
    Action,
    /// 도구 결과 또는 주입된 관찰
    Observation,
    /// 모델의 생각
    Thought,
    /// 누적 비용 갱신
    CostUpdate,
    /// 주기적 회고 프롬프트
    Reflection,
    /// 컨텍스트 요약 시작
    ContextSummarization,
    /// 컨텍스트 요약 완료
    ContextSummarized,
    /// 종료 전 검증 프롬프트
    FinishReflection,
    /// 정상 종료
    Complete,
    /// 반복 한도 도달
    MaxIterations,
    /// 취소됨
    Cancelled,
    /// 실패
    Error,
}

impl StatusEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Iteration => "iteration",
            Self::Action => "action",
            Self::Observation => "observation",
            Self::Thought => "thought",
            Self::CostUpdate => "cost_update",
            Self::Reflection => "reflection",
            Self::ContextSummarization => "context_summarization",
            Self::ContextSummarized => "context_summarized",
            Self::FinishReflection => "finish_reflection",
            Self::Complete => "complete",
            Self::MaxIterations => "max_iterations",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// 실행을 끝내는 이벤트인지
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::MaxIterations | Self::Cancelled | Self::Error
        )
    }
}

impl std::fmt::Display for StatusEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StatusEvent
// ============================================================================

/// 에이전트 상태 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// 이벤트 ID
    pub id: EventId,

    /// 이벤트를 발생시킨 태스크
    pub task_id: String,

    /// 이벤트 타입
    pub event_type: StatusEventType,

    /// 발생 시간
    pub timestamp: DateTime<Utc>,

    /// 이벤트 데이터
    #[serde(default)]
    pub data: Value,
}

impl StatusEvent {
    /// 새 이벤트 생성
    pub fn new(task_id: impl Into<String>, event_type: StatusEventType) -> Self {
        Self {
            id: EventId::new(),
            task_id: task_id.into(),
            event_type,
            timestamp: Utc::now(),
            data: Value::Null,
        }
    }

    /// 데이터 설정
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.event_type.is_terminal()
    }
}
