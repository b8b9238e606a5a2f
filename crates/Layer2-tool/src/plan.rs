//! Plan store - 계획/단계 상태
//!
//! 계획 도구 세 개(`create_plan`, `update_plan_step`, `get_plan_status`)가
//! 같은 `PlanStore`를 공유합니다. 스토어는 에이전트 실행마다 하나씩 만들어
//! 레지스트리 생성 시 주입하므로, 동시에 실행되는 태스크끼리 계획이 섞이지 않습니다.
//!
//! 계획의 집계 상태는 직접 설정하지 않고 단계가 바뀔 때마다 다시 계산합니다.

use chrono::{DateTime, Utc};
use lingo_foundation::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Step
// ============================================================================

/// 단계 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    #[serde(alias = "in-progress", alias = "started")]
    InProgress,
    #[serde(alias = "completed", alias = "done")]
    Complete,
    Blocked,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Blocked => "blocked",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::Pending => "[ ]",
            Self::InProgress => "[~]",
            Self::Complete => "[x]",
            Self::Blocked => "[!]",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 계획의 한 단계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1부터 시작, 생성 후 바뀌지 않음
    pub step: u32,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Plan
// ============================================================================

/// 계획 집계 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    InProgress,
    Complete,
}

/// 계획
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub goal: String,
    pub steps: Vec<Step>,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    fn new(plan_id: String, goal: String, descriptions: Vec<String>) -> Self {
        let steps = descriptions
            .into_iter()
            .enumerate()
            .map(|(i, description)| Step {
                step: i as u32 + 1,
                description,
                status: StepStatus::Pending,
                notes: None,
            })
            .collect();

        let mut plan = Self {
            plan_id,
            goal,
            steps,
            status: PlanStatus::InProgress,
            created_at: Utc::now(),
        };
        plan.recompute_status();
        plan
    }

    fn recompute_status(&mut self) {
        self.status = if !self.steps.is_empty()
            && self.steps.iter().all(|s| s.status == StepStatus::Complete)
        {
            PlanStatus::Complete
        } else {
            PlanStatus::InProgress
        };
    }

    pub fn is_complete(&self) -> bool {
        self.status == PlanStatus::Complete
    }

    /// (완료 단계 수, 전체 단계 수)
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Complete)
            .count();
        (done, self.steps.len())
    }

    pub fn incomplete_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.status != StepStatus::Complete)
    }

    /// 사람이 읽는 형태
    pub fn render(&self) -> String {
        let (done, total) = self.progress();
        let mut out = format!(
            "Plan {} ({}/{} complete): {}\n",
            self.plan_id, done, total, self.goal
        );
        for step in &self.steps {
            out.push_str(&format!(
                "  {} {}. {} ({})",
                step.status.marker(),
                step.step,
                step.description,
                step.status
            ));
            if let Some(ref notes) = step.notes {
                out.push_str(&format!(" - {}", notes));
            }
            out.push('\n');
        }
        out
    }
}

// ============================================================================
// PlanStore
// ============================================================================

#[derive(Debug, Default)]
struct PlanStoreInner {
    plans: Vec<Plan>,
    next_id: u32,
}

/// 에이전트 실행 하나가 소유하는 계획 저장소
#[derive(Debug, Clone, Default)]
pub struct PlanStore {
    inner: Arc<Mutex<PlanStoreInner>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 계획 생성
    pub fn create(&self, goal: impl Into<String>, steps: Vec<String>) -> Result<Plan> {
        let goal = goal.into();
        if goal.trim().is_empty() {
            return Err(Error::Validation("plan goal must not be empty".into()));
        }
        let steps: Vec<String> = steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if steps.is_empty() {
            return Err(Error::Validation("plan needs at least one step".into()));
        }

        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let plan = Plan::new(format!("plan_{}", inner.next_id), goal, steps);
        inner.plans.push(plan.clone());
        Ok(plan)
    }

    /// 단계 상태 변경. `plan_id`가 없으면 가장 최근 계획
    pub fn update_step(
        &self,
        plan_id: Option<&str>,
        step: u32,
        status: StepStatus,
        notes: Option<String>,
    ) -> Result<Plan> {
        let mut inner = self.inner.lock();
        let plan = match plan_id {
            Some(id) => inner.plans.iter_mut().find(|p| p.plan_id == id),
            None => inner.plans.last_mut(),
        }
        .ok_or_else(|| match plan_id {
            Some(id) => Error::NotFound(format!("plan '{}'", id)),
            None => Error::NotFound("no plan has been created yet".into()),
        })?;

        let total = plan.steps.len();
        let target = plan
            .steps
            .iter_mut()
            .find(|s| s.step == step)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "step {} does not exist in {} (steps 1-{})",
                    step, plan.plan_id, total
                ))
            })?;

        target.status = status;
        if notes.is_some() {
            target.notes = notes;
        }
        plan.recompute_status();
        Ok(plan.clone())
    }

    pub fn get(&self, plan_id: &str) -> Option<Plan> {
        self.inner
            .lock()
            .plans
            .iter()
            .find(|p| p.plan_id == plan_id)
            .cloned()
    }

    pub fn latest(&self) -> Option<Plan> {
        self.inner.lock().plans.last().cloned()
    }

    /// 생성 순서대로 모든 계획
    pub fn list(&self) -> Vec<Plan> {
        self.inner.lock().plans.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().plans.is_empty()
    }

    pub fn has_incomplete(&self) -> bool {
        self.inner.lock().plans.iter().any(|p| !p.is_complete())
    }

    /// 미완료 단계 목록. 모두 완료면 `None`
    pub fn incomplete_report(&self) -> Option<String> {
        let inner = self.inner.lock();
        let lines: Vec<String> = inner
            .plans
            .iter()
            .filter(|p| !p.is_complete())
            .flat_map(|p| {
                p.incomplete_steps().map(move |s| {
                    format!(
                        "- {} step {}: {} [{}]",
                        p.plan_id, s.step, s.description, s.status
                    )
                })
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// 프롬프트용 전체 계획 상태
    pub fn status_summary(&self) -> String {
        let inner = self.inner.lock();
        if inner.plans.is_empty() {
            return "No plan created yet.".to_string();
        }
        inner
            .plans
            .iter()
            .map(Plan::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
