//! Event System - 에이전트 상태 이벤트
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────┐  emit()   ┌──────────────────┐  publish()  ┌───────────┐
//! │  Agent Loop  │ ────────▶ │  StatusSink impl │ ──────────▶ │  EventBus │ ──▶ SSE
//! └──────────────┘           │  (task recorder) │             └───────────┘
//!                            └──────────────────┘
//!                                     │ append
//!                                     ▼
//!                               Task Store (JSON)
//! ```
//!
//! - `types.rs` - StatusEvent, StatusEventType
//! - `sink.rs` - StatusSink trait 및 기본 구현
//! - `bus.rs` - 브로드캐스트 EventBus

mod bus;
mod sink;
mod types;

pub use bus::{EventBus, EventBusConfig, EventFilter};
pub use sink::{ChannelSink, CollectingSink, NullSink, StatusSink};
pub use types::{EventId, StatusEvent, StatusEventType};
