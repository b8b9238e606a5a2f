//! Config - 통합 설정 관리
//!
//! - `agent.rs` - 에이전트 실행 설정 (반복 한도, 압축 임계값 등)
//! - `lingo.rs` - LingoConfig 통합 설정 (제공자, 서버, 도구, 가격표)

mod agent;
mod lingo;

pub use agent::{AgentOverrides, AgentSettings, CompactionSettings};
pub use lingo::{
    LingoConfig, ProviderKind, ProviderSettings, ServerSettings, ToolSettings, LINGO_CONFIG_FILE,
};
