//! Agent run state and cancellation

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle phase of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    #[default]
    Idle,
    Thinking,
    Acting,
    Observing,
    Complete,
    Failed,
    Cancelled,
}

impl AgentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentPhase::Complete | AgentPhase::Failed | AgentPhase::Cancelled
        )
    }
}

/// Mutable state of a single run
///
/// 한 실행의 순차 흐름 안에서만 바뀌므로 잠금이 없습니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    pub phase: AgentPhase,
    pub iteration: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,

    /// 종료 전 검증을 이미 요청했는지 (일회성)
    pub verification_requested: bool,

    /// Action 응답 수 (컨텍스트 압축과 무관하게 유지)
    pub action_turns: u32,

    /// 회고 주기 계산용 완료된 Action 반복 수
    pub action_iterations: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 호출 비용 누적
    pub fn record_usage(&mut self, input_tokens: u64, output_tokens: u64, cost: f64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.total_cost += cost;
    }
}

/// Cooperative cancellation flag shared with the outside world
///
/// 루프는 매 반복 시작에서만 확인합니다. 진행 중인 LLM/도구 호출은 끝까지 기다립니다.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_cancelled());
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_record_usage() {
        let mut state = RunState::new();
        state.record_usage(100, 10, 0.25);
        state.record_usage(50, 5, 0.25);
        assert_eq!(state.input_tokens, 150);
        assert_eq!(state.total_cost, 0.5);
        assert!(!state.phase.is_terminal());
    }
}
