//! Tool Registry - manages available tools

use crate::builtin::{
    command::RunCommandTool,
    delete::DeleteFileTool,
    glob::ListFilesTool,
    plan::{CreatePlanTool, GetPlanStatusTool, UpdatePlanStepTool},
    query::QueryDatabaseTool,
    read::ReadFileTool,
    write::WriteFileTool,
};
use crate::plan::PlanStore;
use crate::{DynTool, ToolContext, ToolDef, ToolResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of available tools
///
/// 이름순으로 정렬해 두어 프롬프트에 들어가는 도구 목록이 실행마다 같습니다.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn DynTool>>,
    plans: PlanStore,
}

impl ToolRegistry {
    /// Create a new empty registry around a plan store
    pub fn new(plans: PlanStore) -> Self {
        Self {
            tools: BTreeMap::new(),
            plans,
        }
    }

    /// 계획 도구 세 개만 등록
    pub fn with_planning(plans: PlanStore) -> Self {
        let mut registry = Self::new(plans.clone());
        registry.register(CreatePlanTool::new(plans.clone()));
        registry.register(UpdatePlanStepTool::new(plans.clone()));
        registry.register(GetPlanStatusTool::new(plans));
        registry
    }

    /// Create a registry with all builtin tools
    pub fn with_builtins(plans: PlanStore) -> Self {
        let mut registry = Self::with_planning(plans);
        registry.register(ReadFileTool::new());
        registry.register(WriteFileTool::new());
        registry.register(DeleteFileTool::new());
        registry.register(ListFilesTool::new());
        registry.register(RunCommandTool::new());
        registry.register(QueryDatabaseTool::new());
        registry
    }

    /// Register a tool (replaces a tool with the same name)
    pub fn register<T: DynTool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn DynTool>) {
        let name = tool.name();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced existing tool");
        }
    }

    /// The plan store shared with the planning tools
    pub fn plans(&self) -> &PlanStore {
        &self.plans
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DynTool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Get all tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 시스템 프롬프트용 도구 설명
    pub fn describe(&self) -> String {
        self.definitions()
            .iter()
            .map(ToolDef::to_prompt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Execute a tool by name
    ///
    /// 알 수 없는 이름, 잘못된 파라미터, 핸들러 오류 모두 실패 결과로 돌려주며 패닉하거나
    /// 오류를 올려보내지 않습니다.
    pub async fn execute(&self, name: &str, ctx: &ToolContext, params: Value) -> ToolResult {
        match self.get(name) {
            Some(tool) => tool.execute(ctx, params).await,
            None => {
                warn!(tool = %name, task_id = %ctx.task_id, "Unknown tool requested");
                ToolResult::unknown_tool(name, &self.names())
            }
        }
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext::new("task-1", ".")
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ToolRegistry::with_builtins(PlanStore::new());
        assert_eq!(registry.len(), 9);
        assert!(registry.contains("create_plan"));
        assert!(registry.contains("query_database"));

        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_describe_mentions_every_tool() {
        let registry = ToolRegistry::with_planning(PlanStore::new());
        let text = registry.describe();
        for name in registry.names() {
            assert!(text.contains(&name));
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_structured_failure() {
        let registry = ToolRegistry::with_planning(PlanStore::new());
        let result = registry.execute("teleport", &ctx(), json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some(crate::UNKNOWN_TOOL));
        assert!(result.error.unwrap().contains("create_plan"));
    }

    #[tokio::test]
    async fn test_registry_store_is_the_injected_one() {
        let plans = PlanStore::new();
        let registry = ToolRegistry::with_planning(plans.clone());
        let result = registry
            .execute(
                "create_plan",
                &ctx(),
                json!({"goal": "g", "steps": ["a", "b", "c"]}),
            )
            .await;
        assert!(result.success);
        assert_eq!(plans.list().len(), 1);
        assert_eq!(registry.plans().list().len(), 1);
    }

    #[tokio::test]
    async fn test_separate_stores_do_not_collide() {
        let a = ToolRegistry::with_planning(PlanStore::new());
        let b = ToolRegistry::with_planning(PlanStore::new());
        a.execute("create_plan", &ctx(), json!({"goal": "g", "steps": ["x"]}))
            .await;
        assert!(a.plans().has_incomplete());
        assert!(b.plans().is_empty());
    }
}
