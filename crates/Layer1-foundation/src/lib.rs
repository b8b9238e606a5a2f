//! # lingo-foundation
//!
//! Foundation layer for Lingo:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Config: 통합 설정 (LingoConfig, AgentSettings 등)
//! - Event: 에이전트 상태 이벤트, StatusSink, EventBus
//! - Storage: JsonStore (설정, 태스크 레코드)
//! - Pricing: 모델별 토큰 비용
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer4  lingo-cli ─── lingo-server (HTTP/SSE, runner)   │
//! │                     │                                   │
//! │  Layer3        lingo-agent (parser, loop, summarizer)    │
//! │                     │                                   │
//! │  Layer2  lingo-provider · lingo-tool · lingo-task        │
//! │                     │                                   │
//! │  Layer1        lingo-foundation                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod pricing;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    AgentOverrides, AgentSettings, CompactionSettings, LingoConfig, ProviderKind,
    ProviderSettings, ServerSettings, ToolSettings, LINGO_CONFIG_FILE,
};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    ChannelSink, CollectingSink, EventBus, EventBusConfig, EventFilter, EventId, NullSink,
    StatusEvent, StatusEventType, StatusSink,
};

// ============================================================================
// Pricing (비용)
// ============================================================================
pub use pricing::{ModelPricing, PricingTable, TokenRate};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, APP_DIR_NAME, PROJECT_DIR_NAME};
