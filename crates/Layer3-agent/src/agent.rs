//! Agent loop
//!
//! 반복 한 번: LLM 호출 → 응답 파싱 → (Finish 가드 | 도구 실행 | 재촉) → 압축 확인.
//!
//! ```text
//! idle ─▶ thinking ─▶ acting ─▶ observing ─┐
//!            ▲                             │
//!            └─────────────────────────────┘
//!            │
//!            ├─▶ complete        (Finish 수락)
//!            ├─▶ max_iterations  (반복 한도, 성공으로 취급)
//!            ├─▶ cancelled       (반복 시작 시 취소 플래그 확인)
//!            └─▶ failed          (LLM 호출 실패)
//! ```
//!
//! 루프는 HTTP나 저장소를 모릅니다. 모든 전이는 `StatusSink`로 나가는
//! `StatusEvent` 하나로 보고됩니다.

use crate::parser::{parse_response, ActionCall, ParsedResponse};
use crate::prompts::{
    incomplete_plan_message, render, PromptTemplates, FIRST_ITERATION_FINISH,
    HALLUCINATED_FINISH, NO_ACTION_NUDGE,
};
use crate::state::{AgentPhase, CancelHandle, RunState};
use crate::summarizer::ContextSummarizer;
use crate::turn::{estimate_tokens, render_prompt, Turn};
use lingo_foundation::{
    AgentSettings, PricingTable, StatusEvent, StatusEventType, StatusSink, ToolSettings,
};
use lingo_provider::{CompletionRequest, GenerationConfig, Provider, ProviderError, TokenUsage};
use lingo_tool::{PlanStore, ToolContext, ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 완료 주장으로 보는 단어들
const COMPLETION_CLAIMS: &[&str] = &[
    "created", "modified", "edited", "wrote", "updated", "generated", "saved",
];

// ============================================================================
// Outcome
// ============================================================================

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    MaxIterationsReached,
    Cancelled,
    Failed,
}

impl RunStatus {
    /// Failed만 오류
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::MaxIterationsReached)
    }
}

/// Structured result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iterations: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

// ============================================================================
// Agent
// ============================================================================

/// ReAct lesson-editing agent
///
/// 도구 레지스트리(그리고 그 안의 `PlanStore`)는 에이전트가 소유하므로
/// 태스크마다 새 `Agent`를 만듭니다.
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    settings: AgentSettings,
    pricing: PricingTable,
    templates: PromptTemplates,
    tool_settings: ToolSettings,
}

impl Agent {
    /// Create an agent with all builtin tools and a fresh plan store
    pub fn new(provider: Arc<dyn Provider>, settings: AgentSettings) -> Self {
        Self {
            provider,
            tools: ToolRegistry::with_builtins(PlanStore::new()),
            settings,
            pricing: PricingTable::default(),
            templates: PromptTemplates::default(),
            tool_settings: ToolSettings::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// 작업 디렉터리, DB 경로, 명령 제한
    pub fn with_tool_settings(mut self, tool_settings: ToolSettings) -> Self {
        self.tool_settings = tool_settings;
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn plans(&self) -> &PlanStore {
        self.tools.plans()
    }

    /// Run the loop until a terminal state
    ///
    /// 오류를 돌려주지 않습니다. LLM 실패는 `RunStatus::Failed`와 `error` 이벤트가 됩니다.
    pub async fn run(
        &self,
        task_id: &str,
        task: &str,
        sink: &dyn StatusSink,
        cancel: &CancelHandle,
    ) -> RunOutcome {
        let summarizer =
            ContextSummarizer::new(self.provider.clone(), self.settings.compaction.clone())
                .with_template(self.templates.summarize.clone())
                .with_max_output_tokens(self.settings.max_output_tokens);

        let run = Run {
            agent: self,
            task_id,
            task,
            sink,
            cancel,
            summarizer,
            ctx: ToolContext::from_settings(task_id, &self.tool_settings),
            state: RunState::new(),
            turns: Vec::new(),
        };
        run.execute().await
    }
}

// ============================================================================
// Run (one execution)
// ============================================================================

struct Run<'a> {
    agent: &'a Agent,
    task_id: &'a str,
    task: &'a str,
    sink: &'a dyn StatusSink,
    cancel: &'a CancelHandle,
    summarizer: ContextSummarizer,
    ctx: ToolContext,
    state: RunState,
    turns: Vec<Turn>,
}

impl<'a> Run<'a> {
    async fn execute(mut self) -> RunOutcome {
        let agent = self.agent;
        let settings = &agent.settings;
        let max = settings.max_iterations;

        let system = render(
            &agent.templates.system,
            &[
                ("tools", agent.tools.describe()),
                ("task", self.task.to_string()),
            ],
        );
        self.turns.push(Turn::system(system));

        info!(
            task_id = %self.task_id,
            model = %settings.model,
            max_iterations = max,
            "Agent run started"
        );
        self.emit(
            StatusEventType::Start,
            json!({
                "task": self.task,
                "model": settings.model,
                "max_iterations": max,
                "tools": agent.tools.names(),
            }),
        )
        .await;

        loop {
            if self.cancel.is_cancelled() {
                return self.finish_cancelled().await;
            }
            if self.state.iteration >= max {
                return self.finish_max_iterations().await;
            }

            self.state.iteration += 1;
            self.state.phase = AgentPhase::Thinking;
            let iteration = self.state.iteration;
            debug!(task_id = %self.task_id, iteration, "Iteration started");
            self.emit(
                StatusEventType::Iteration,
                json!({ "iteration": iteration, "max_iterations": max }),
            )
            .await;

            let text = match self.call_llm().await {
                Ok(text) => text,
                Err(e) => return self.finish_failed(e).await,
            };

            // 진행 중이던 호출의 응답은 버리고 반복 시작에서 취소 처리
            if self.cancel.is_cancelled() {
                debug!(task_id = %self.task_id, iteration, "Cancelled during LLM call");
                continue;
            }

            match parse_response(&text) {
                ParsedResponse::Finish(summary) => {
                    if let Some(outcome) = self.handle_finish(text, summary).await {
                        return outcome;
                    }
                }
                ParsedResponse::Action { thought, actions } => {
                    self.handle_actions(text, thought, actions).await;
                }
                ParsedResponse::Thought(thought) => {
                    self.handle_thought(text, thought).await;
                }
            }

            self.maybe_compact().await;
        }
    }

    // ========================================================================
    // LLM
    // ========================================================================

    async fn call_llm(&mut self) -> Result<String, ProviderError> {
        let agent = self.agent;
        let settings = &agent.settings;
        let prompt = render_prompt(&self.turns, self.state.iteration, settings.max_iterations);
        let request = CompletionRequest::new(prompt).with_config(GenerationConfig {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        });

        let response = agent.provider.complete(&request).await?;
        self.record_usage(response.usage).await;
        Ok(response.text)
    }

    async fn record_usage(&mut self, usage: TokenUsage) {
        let cost = self.agent.pricing.cost(
            &self.agent.settings.model,
            usage.input_tokens,
            usage.output_tokens,
        );
        self.state
            .record_usage(usage.input_tokens, usage.output_tokens, cost);

        self.emit(
            StatusEventType::CostUpdate,
            json!({
                "input_tokens": usage.input_tokens,
                "output_tokens": usage.output_tokens,
                "call_cost": cost,
                "total_cost": self.state.total_cost,
                "total_input_tokens": self.state.input_tokens,
                "total_output_tokens": self.state.output_tokens,
            }),
        )
        .await;
    }

    // ========================================================================
    // Response handling
    // ========================================================================

    /// Finish 가드 → 일회성 검증 → 수락
    async fn handle_finish(&mut self, text: String, summary: String) -> Option<RunOutcome> {
        self.turns.push(Turn::response(text));
        let iteration = self.state.iteration;

        if iteration == 1 {
            self.reject_finish("first_iteration", FIRST_ITERATION_FINISH.to_string())
                .await;
            return None;
        }

        if self.state.action_turns == 0 && claims_changes(&summary) {
            self.reject_finish("hallucination", HALLUCINATED_FINISH.to_string())
                .await;
            return None;
        }

        if let Some(report) = self.agent.plans().incomplete_report() {
            self.reject_finish("incomplete_plan", incomplete_plan_message(&report))
                .await;
            return None;
        }

        let settings = &self.agent.settings;
        let has_budget =
            iteration + settings.finish_verification_margin < settings.max_iterations;
        if !self.state.verification_requested && has_budget {
            self.request_verification(&summary).await;
            return None;
        }

        Some(self.finish_complete(summary).await)
    }

    async fn reject_finish(&mut self, guard: &str, message: String) {
        info!(
            task_id = %self.task_id,
            iteration = self.state.iteration,
            guard,
            "Finish rejected"
        );
        self.turns.push(Turn::observation(message.clone()));
        self.emit(
            StatusEventType::Observation,
            json!({ "guard": guard, "message": message }),
        )
        .await;
    }

    async fn request_verification(&mut self, summary: &str) {
        let agent = self.agent;
        let settings = &agent.settings;
        let iteration = self.state.iteration;
        let prompt = render(
            &agent.templates.finish_verification,
            &[
                ("task", self.task.to_string()),
                ("summary", summary.to_string()),
                ("plan_status", agent.plans().status_summary()),
                ("iteration", iteration.to_string()),
                ("max_iterations", settings.max_iterations.to_string()),
                (
                    "remaining",
                    settings.max_iterations.saturating_sub(iteration).to_string(),
                ),
                ("cost", format!("{:.4}", self.state.total_cost)),
            ],
        );

        self.state.verification_requested = true;
        self.turns.push(Turn::reflection(prompt));
        debug!(task_id = %self.task_id, iteration, "Finish verification requested");
        self.emit(
            StatusEventType::FinishReflection,
            json!({ "iteration": iteration, "summary": summary }),
        )
        .await;
    }

    async fn handle_actions(&mut self, text: String, thought: String, actions: Vec<ActionCall>) {
        self.turns.push(Turn::response(text));
        self.state.action_turns += 1;
        let iteration = self.state.iteration;

        if self.state.verification_requested {
            // 검증 후 다시 작업하면 다음 Finish도 검증
            self.state.verification_requested = false;
            debug!(task_id = %self.task_id, iteration, "Verification flag cleared");
        }

        if !thought.is_empty() {
            self.emit(
                StatusEventType::Thought,
                json!({ "iteration": iteration, "thought": thought }),
            )
            .await;
        }

        let mut results: Vec<(String, ToolResult)> = Vec::with_capacity(actions.len());
        for action in actions {
            self.state.phase = AgentPhase::Acting;
            info!(task_id = %self.task_id, iteration, tool = %action.tool_name, "Executing tool");
            self.emit(
                StatusEventType::Action,
                json!({
                    "iteration": iteration,
                    "tool": action.tool_name,
                    "params": action.params,
                }),
            )
            .await;

            let result = self
                .agent
                .tools
                .execute(&action.tool_name, &self.ctx, action.params)
                .await;
            if !result.success {
                warn!(
                    task_id = %self.task_id,
                    tool = %action.tool_name,
                    error = result.error.as_deref().unwrap_or(""),
                    "Tool call failed"
                );
            }

            self.state.phase = AgentPhase::Observing;
            self.emit(
                StatusEventType::Observation,
                json!({
                    "iteration": iteration,
                    "tool": action.tool_name,
                    "success": result.success,
                    "result": result.to_value(),
                }),
            )
            .await;
            results.push((action.tool_name, result));
        }

        self.turns
            .push(Turn::observation(format_observations(&results)));
        self.state.action_iterations += 1;
        self.state.phase = AgentPhase::Thinking;

        let interval = self.agent.settings.reflection_interval.max(1);
        if self.state.action_iterations % interval == 0 {
            self.inject_reflection().await;
        }
    }

    async fn inject_reflection(&mut self) {
        let agent = self.agent;
        let settings = &agent.settings;
        let prompt = render(
            &agent.templates.reflection,
            &[
                ("iteration", self.state.iteration.to_string()),
                ("max_iterations", settings.max_iterations.to_string()),
                ("action_iterations", self.state.action_iterations.to_string()),
                ("plan_status", agent.plans().status_summary()),
                ("cost", format!("{:.4}", self.state.total_cost)),
            ],
        );
        self.turns.push(Turn::reflection(prompt));
        self.emit(
            StatusEventType::Reflection,
            json!({
                "iteration": self.state.iteration,
                "action_iterations": self.state.action_iterations,
            }),
        )
        .await;
    }

    async fn handle_thought(&mut self, text: String, thought: String) {
        self.turns.push(Turn::response(text));
        self.emit(
            StatusEventType::Thought,
            json!({ "iteration": self.state.iteration, "thought": thought }),
        )
        .await;

        self.turns.push(Turn::observation(NO_ACTION_NUDGE));
        self.emit(
            StatusEventType::Observation,
            json!({ "guard": "no_action", "message": NO_ACTION_NUDGE }),
        )
        .await;
    }

    // ========================================================================
    // Compaction
    // ========================================================================

    async fn maybe_compact(&mut self) {
        if !self.summarizer.should_compact(&self.turns) {
            return;
        }

        let before = self.turns.len();
        self.emit(
            StatusEventType::ContextSummarization,
            json!({ "turns": before, "estimated_tokens": estimate_tokens(&self.turns) }),
        )
        .await;

        let compaction = self.summarizer.compact(&self.turns).await;
        if let Some(usage) = compaction.usage {
            self.record_usage(usage).await;
        }
        self.turns = compaction.turns;

        self.emit(
            StatusEventType::ContextSummarized,
            json!({
                "turns_before": before,
                "turns_after": self.turns.len(),
                "summarized": compaction.summarized,
                "plan_fragments": compaction.plan_fragments,
                "estimated_tokens": estimate_tokens(&self.turns),
            }),
        )
        .await;
    }

    // ========================================================================
    // Terminal states
    // ========================================================================

    async fn finish_complete(&mut self, summary: String) -> RunOutcome {
        self.state.phase = AgentPhase::Complete;
        info!(
            task_id = %self.task_id,
            iterations = self.state.iteration,
            cost = self.state.total_cost,
            "Agent run complete"
        );

        let mut data = self.totals();
        data["summary"] = Value::String(summary.clone());
        self.emit(StatusEventType::Complete, data).await;
        self.outcome(RunStatus::Complete, Some(summary), None)
    }

    async fn finish_max_iterations(&mut self) -> RunOutcome {
        self.state.phase = AgentPhase::Complete;
        let summary = format!(
            "Stopped after reaching the iteration limit ({}).\n{}",
            self.state.iteration,
            self.agent.plans().status_summary()
        );
        warn!(task_id = %self.task_id, iterations = self.state.iteration, "Max iterations reached");

        let mut data = self.totals();
        data["max_iterations"] = json!(self.agent.settings.max_iterations);
        data["summary"] = Value::String(summary.clone());
        self.emit(StatusEventType::MaxIterations, data).await;
        self.outcome(RunStatus::MaxIterationsReached, Some(summary), None)
    }

    async fn finish_cancelled(&mut self) -> RunOutcome {
        self.state.phase = AgentPhase::Cancelled;
        info!(task_id = %self.task_id, iterations = self.state.iteration, "Agent run cancelled");

        let data = self.totals();
        self.emit(StatusEventType::Cancelled, data).await;
        self.outcome(RunStatus::Cancelled, None, None)
    }

    async fn finish_failed(&mut self, err: ProviderError) -> RunOutcome {
        self.state.phase = AgentPhase::Failed;
        let message = err.to_string();
        error!(
            task_id = %self.task_id,
            iteration = self.state.iteration,
            error = %message,
            "Agent run failed"
        );

        let mut data = self.totals();
        data["error"] = Value::String(message.clone());
        self.emit(StatusEventType::Error, data).await;
        self.outcome(RunStatus::Failed, None, Some(message))
    }

    fn totals(&self) -> Value {
        json!({
            "iterations": self.state.iteration,
            "total_cost": self.state.total_cost,
            "total_input_tokens": self.state.input_tokens,
            "total_output_tokens": self.state.output_tokens,
        })
    }

    fn outcome(
        &self,
        status: RunStatus,
        summary: Option<String>,
        error: Option<String>,
    ) -> RunOutcome {
        RunOutcome {
            status,
            summary,
            error,
            iterations: self.state.iteration,
            input_tokens: self.state.input_tokens,
            output_tokens: self.state.output_tokens,
            total_cost: self.state.total_cost,
        }
    }

    async fn emit(&self, event_type: StatusEventType, data: Value) {
        self.sink
            .emit(StatusEvent::new(self.task_id, event_type).with_data(data))
            .await;
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn claims_changes(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    COMPLETION_CLAIMS.iter().any(|word| lower.contains(word))
}

/// 한 턴의 관찰 결과. 하나면 단수형, 여럿이면 번호를 붙임
fn format_observations(results: &[(String, ToolResult)]) -> String {
    match results {
        [(_, result)] => format!("Observation: {}", result.to_value()),
        _ => results
            .iter()
            .enumerate()
            .map(|(i, (tool, result))| {
                format!("Observation {} ({}): {}", i + 1, tool, result.to_value())
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_changes() {
        assert!(claims_changes("I Created lesson 4"));
        assert!(claims_changes("saved the file"));
        assert!(!claims_changes("Nothing needed to change"));
    }

    #[test]
    fn test_format_observations_forms() {
        let single = vec![("read_file".to_string(), ToolResult::success("hola"))];
        let text = format_observations(&single);
        assert!(text.starts_with("Observation: {"));
        assert!(text.contains("hola"));

        let many = vec![
            ("read_file".to_string(), ToolResult::success("a")),
            ("list_files".to_string(), ToolResult::error("boom")),
        ];
        let text = format_observations(&many);
        assert!(text.starts_with("Observation 1 (read_file):"));
        assert!(text.contains("\nObservation 2 (list_files):"));
    }

    #[test]
    fn test_run_status_success() {
        assert!(RunStatus::MaxIterationsReached.is_success());
        assert!(!RunStatus::Cancelled.is_success());
    }
}
