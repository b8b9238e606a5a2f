//! # lingo-agent
//!
//! 레슨 파일을 도구 호출로 편집하는 ReAct 에이전트입니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **Parser**: 모델 응답 → `Thought` / `Action` / `Finish`
//! - **Scanner**: 응답 안 JSON 객체 범위를 찾는 상태 기계
//! - **Summarizer**: 오래된 턴을 요약으로 교체 (계획 데이터는 원문 보존)
//! - **Agent**: 가드, 검증, 회고, 취소, 압축을 포함한 메인 루프
//!
//! ## 사용 예
//!
//! ```ignore
//! use lingo_agent::{Agent, CancelHandle};
//! use lingo_foundation::{AgentSettings, NullSink};
//!
//! let agent = Agent::new(provider, AgentSettings::default())
//!     .with_tool_settings(config.tools.clone());
//!
//! let cancel = CancelHandle::new();
//! let outcome = agent.run("task-1", "Add 5 food words to lesson 3", &NullSink, &cancel).await;
//! println!("{:?}: {:?}", outcome.status, outcome.summary);
//! ```

pub mod agent;
pub mod parser;
pub mod prompts;
pub mod scanner;
pub mod state;
pub mod summarizer;
pub mod turn;

// ============================================================================
// Re-exports
// ============================================================================

pub use agent::{Agent, RunOutcome, RunStatus};
pub use parser::{parse_response, ActionCall, ParsedResponse};
pub use prompts::PromptTemplates;
pub use scanner::{JsonSpanScanner, ScanStep};
pub use state::{AgentPhase, CancelHandle, RunState};
pub use summarizer::{Compaction, ContextSummarizer};
pub use turn::{Turn, TurnKind};
