//! Task record and related types

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use lingo_foundation::{AgentSettings, Error, StatusEvent, StatusEventType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 로그용 짧은 형태
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidInput(format!("Invalid task id: {}", s)))
    }
}

/// Final outcome payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Completion summary from the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Error message for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            summary: None,
            error: Some(error.into()),
        }
    }
}

/// A submitted task and everything its agent run reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub prompt: String,
    pub config: AgentSettings,
    pub status: TaskStatus,

    /// 에이전트가 보낸 이벤트 (순서대로)
    #[serde(default)]
    pub events: Vec<StatusEvent>,

    pub iterations: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}

impl TaskRecord {
    /// Create a new running task
    pub fn new(prompt: impl Into<String>, config: AgentSettings) -> Self {
        Self {
            id: TaskId::new(),
            prompt: prompt.into(),
            config,
            status: TaskStatus::Running,
            events: Vec::new(),
            iterations: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 이벤트 기록 및 카운터/상태 반영
    pub fn apply_event(&mut self, event: &StatusEvent) {
        let data = &event.data;

        match event.event_type {
            StatusEventType::Iteration => {
                if let Some(i) = u64_field(data, "iteration") {
                    self.iterations = i as u32;
                }
            }
            StatusEventType::CostUpdate => self.apply_totals(data),
            StatusEventType::Complete => {
                let summary = str_field(data, "summary").unwrap_or_default();
                self.finish(TaskStatus::Complete, TaskResult::success(summary), data);
            }
            StatusEventType::MaxIterations => {
                let result = TaskResult {
                    summary: str_field(data, "summary"),
                    error: None,
                };
                self.finish(TaskStatus::MaxIterationsReached, result, data);
            }
            StatusEventType::Cancelled => {
                self.finish(TaskStatus::Cancelled, TaskResult::default(), data);
            }
            StatusEventType::Error => {
                let error = str_field(data, "error").unwrap_or_else(|| "unknown error".into());
                self.finish(TaskStatus::Failed, TaskResult::failure(error), data);
            }
            _ => {}
        }

        self.events.push(event.clone());
    }

    fn apply_totals(&mut self, data: &Value) {
        if let Some(v) = u64_field(data, "total_input_tokens") {
            self.input_tokens = v;
        }
        if let Some(v) = u64_field(data, "total_output_tokens") {
            self.output_tokens = v;
        }
        if let Some(v) = data.get("total_cost").and_then(Value::as_f64) {
            self.cost_usd = v;
        }
    }

    fn finish(&mut self, status: TaskStatus, result: TaskResult, data: &Value) {
        if let Some(i) = u64_field(data, "iterations") {
            self.iterations = i as u32;
        }
        self.apply_totals(data);
        self.status = status;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// 이벤트 기록 없이 요약
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            prompt: self.prompt.clone(),
            model: self.config.model.clone(),
            status: self.status,
            iterations: self.iterations,
            cost_usd: self.cost_usd,
            event_count: self.events.len(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// List view of a task (no event history)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub prompt: String,
    pub model: String,
    pub status: TaskStatus,
    pub iterations: u32,
    pub cost_usd: f64,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn u64_field(data: &Value, key: &str) -> Option<u64> {
    data.get(key).and_then(Value::as_u64)
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}
