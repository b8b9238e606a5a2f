//! Task status

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task
///
/// 태스크는 생성 즉시 `Running`이며, 나머지는 모두 종료 상태입니다.
/// 종료 상태에 도달한 레코드는 저장소가 더 이상 수정하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Agent loop is running
    Running,

    /// Finished with an accepted completion
    Complete,

    /// LLM failure
    Failed,

    /// Cancelled by request
    Cancelled,

    /// Iteration budget exhausted (counts as success)
    MaxIterationsReached,
}

impl TaskStatus {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// Check if the run ended without an error
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::MaxIterationsReached
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::MaxIterationsReached => "max_iterations_reached",
        }
    }

    /// Get a symbol for the state (for CLI listings)
    pub fn symbol(&self) -> &'static str {
        match self {
            TaskStatus::Running => "⟳",
            TaskStatus::Complete => "✓",
            TaskStatus::Failed => "✗",
            TaskStatus::Cancelled => "⊘",
            TaskStatus::MaxIterationsReached => "⏱",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::MaxIterationsReached.is_success());
        assert!(!TaskStatus::Failed.is_success());
    }

    #[test]
    fn test_serde_name() {
        assert_eq!(
            serde_json::to_value(TaskStatus::MaxIterationsReached).unwrap(),
            serde_json::json!("max_iterations_reached")
        );
    }
}
