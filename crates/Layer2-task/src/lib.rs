//! # lingo-task
//!
//! Task records and the on-disk task store.
//!
//! 태스크 하나는 에이전트 실행 하나에 대응합니다. 레코드는 실행 중 에이전트가 보낸
//! 상태 이벤트로만 갱신되고, 종료 상태에 도달하면 더 이상 바뀌지 않습니다.

pub mod state;
pub mod store;
pub mod task;

pub use state::TaskStatus;
pub use store::TaskStore;
pub use task::{TaskId, TaskRecord, TaskResult, TaskSummary};
