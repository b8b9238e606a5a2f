//! Planning tools - create_plan, update_plan_step, get_plan_status

use crate::plan::{PlanStore, StepStatus};
use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::Result;
use serde::Deserialize;
use tracing::info;

// ============================================================================
// create_plan
// ============================================================================

/// 문자열 또는 `{description}` 객체
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Text(String),
    Detailed { description: String },
}

impl StepSpec {
    fn into_description(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Detailed { description } => description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanParams {
    #[serde(alias = "task")]
    pub goal: String,
    pub steps: Vec<StepSpec>,
}

/// 계획 생성 도구
pub struct CreatePlanTool {
    store: PlanStore,
}

impl CreatePlanTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreatePlanTool {
    type Params = CreatePlanParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "create_plan",
            "Break the task into ordered steps before editing anything. Returns the plan with numbered steps.",
        )
        .string_param("goal", "What the plan accomplishes", true)
        .string_array_param("steps", "Ordered step descriptions", true)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: CreatePlanParams) -> Result<ToolResult> {
        let steps = params
            .steps
            .into_iter()
            .map(StepSpec::into_description)
            .collect();
        let plan = self.store.create(params.goal, steps)?;
        info!(task_id = %ctx.task_id, plan_id = %plan.plan_id, steps = plan.steps.len(), "Plan created");

        Ok(ToolResult::success_with_metadata(
            plan.render(),
            serde_json::json!({ "plan": plan }),
        ))
    }
}

// ============================================================================
// update_plan_step
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdatePlanStepParams {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(alias = "step")]
    pub step_number: u32,
    pub status: StepStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 단계 상태 변경 도구
pub struct UpdatePlanStepTool {
    store: PlanStore,
}

impl UpdatePlanStepTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdatePlanStepTool {
    type Params = UpdatePlanStepParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "update_plan_step",
            "Set the status of one plan step. Mark a step complete only after its tool calls succeeded.",
        )
        .string_param("plan_id", "Plan id (default: most recent plan)", false)
        .integer_param("step_number", "1-based step number", true)
        .enum_param(
            "status",
            "New status",
            &["pending", "in_progress", "complete", "blocked"],
            true,
        )
        .string_param("notes", "Optional notes about the step", false)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: UpdatePlanStepParams) -> Result<ToolResult> {
        let plan = self.store.update_step(
            params.plan_id.as_deref(),
            params.step_number,
            params.status,
            params.notes,
        )?;
        info!(
            task_id = %ctx.task_id,
            plan_id = %plan.plan_id,
            step = params.step_number,
            status = %params.status,
            "Plan step updated"
        );

        let (done, total) = plan.progress();
        Ok(ToolResult::success_with_metadata(
            format!(
                "Step {} of {} is now {} ({}/{} complete)",
                params.step_number, plan.plan_id, params.status, done, total
            ),
            serde_json::json!({ "plan": plan }),
        ))
    }
}

// ============================================================================
// get_plan_status
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GetPlanStatusParams {
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// 계획 상태 조회 도구
pub struct GetPlanStatusTool {
    store: PlanStore,
}

impl GetPlanStatusTool {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetPlanStatusTool {
    type Params = GetPlanStatusParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder("get_plan_status", "Show plans and the status of every step.")
            .string_param("plan_id", "Only this plan (default: all plans)", false)
            .build()
    }

    async fn call(&self, _ctx: &ToolContext, params: GetPlanStatusParams) -> Result<ToolResult> {
        match params.plan_id {
            Some(id) => match self.store.get(&id) {
                Some(plan) => Ok(ToolResult::success_with_metadata(
                    plan.render(),
                    serde_json::json!({ "plan": plan }),
                )),
                None => Ok(ToolResult::error(format!("Plan '{}' not found", id))),
            },
            None => Ok(ToolResult::success_with_metadata(
                self.store.status_summary(),
                serde_json::json!({ "plans": self.store.list() }),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynTool;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext::new("task-1", ".")
    }

    #[tokio::test]
    async fn test_create_then_update_shares_store() {
        let store = PlanStore::new();
        let create = CreatePlanTool::new(store.clone());
        let update = UpdatePlanStepTool::new(store.clone());

        let result = create
            .execute(
                &ctx(),
                json!({"goal": "Fix lesson", "steps": ["read", {"description": "write"}]}),
            )
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.metadata.unwrap()["plan"]["steps"][1]["description"], "write");

        let result = update
            .execute(&ctx(), json!({"step": 1, "status": "complete"}))
            .await;
        assert!(result.success);
        assert!(result.content.contains("1/2 complete"));
        assert!(store.has_incomplete());
    }

    #[tokio::test]
    async fn test_bad_status_is_invalid_parameters() {
        let update = UpdatePlanStepTool::new(PlanStore::new());
        let result = update
            .execute(&ctx(), json!({"step_number": 1, "status": "finished-ish"}))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some(crate::INVALID_PARAMETERS));
    }

    #[tokio::test]
    async fn test_update_without_plan_is_failure_not_panic() {
        let update = UpdatePlanStepTool::new(PlanStore::new());
        let result = update
            .execute(&ctx(), json!({"step_number": 1, "status": "complete"}))
            .await;
        assert!(!result.success);
        assert!(result.error_kind.is_none());
    }

    #[tokio::test]
    async fn test_get_status_without_params() {
        let store = PlanStore::new();
        let tool = GetPlanStatusTool::new(store.clone());
        let result = tool.execute(&ctx(), serde_json::Value::Null).await;
        assert!(result.success);
        assert_eq!(result.content, "No plan created yet.");
    }
}
