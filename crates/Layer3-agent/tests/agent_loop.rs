//! End-to-end agent loop tests driven by a scripted provider

use lingo_agent::{Agent, CancelHandle, RunStatus};
use lingo_foundation::{
    AgentSettings, CollectingSink, CompactionSettings, StatusEvent, StatusEventType, ToolSettings,
};
use lingo_provider::{ProviderError, ScriptStep, ScriptedProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const CREATE_PLAN: &str = r#"Thought: I will plan the work first.
Action: {"tool_name": "create_plan", "params": {"goal": "Add food words", "steps": ["Read lesson", "Add words", "Save lesson"]}}"#;

const LIST_FILES: &str = r#"Thought: Look around.
Action: {"tool_name": "list_files", "params": {"pattern": "*"}}"#;

fn agent_with(provider: &ScriptedProvider, settings: AgentSettings, dir: &Path) -> Agent {
    let tools = ToolSettings {
        workspace_root: Some(dir.to_path_buf()),
        ..ToolSettings::default()
    };
    Agent::new(Arc::new(provider.clone()), settings).with_tool_settings(tools)
}

fn settings(max_iterations: u32) -> AgentSettings {
    AgentSettings::default().with_max_iterations(max_iterations)
}

fn of_type(events: &[StatusEvent], kind: StatusEventType) -> Vec<StatusEvent> {
    events
        .iter()
        .filter(|e| e.event_type == kind)
        .cloned()
        .collect()
}

fn guards(events: &[StatusEvent]) -> Vec<String> {
    of_type(events, StatusEventType::Observation)
        .iter()
        .filter_map(|e| e.data.get("guard").and_then(|g| g.as_str()).map(String::from))
        .collect()
}

#[tokio::test]
async fn test_first_iteration_finish_is_rejected() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        "Finish: nothing to do",
        "Finish: nothing to do",
        "Finish: nothing to do",
    ]);
    let agent = agent_with(&provider, settings(10), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t1", "Check lesson 1", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.iterations, 3);
    let events = sink.events();
    assert_eq!(guards(&events), vec!["first_iteration"]);
    assert_eq!(of_type(&events, StatusEventType::FinishReflection).len(), 1);
    assert_eq!(events.last().unwrap().event_type, StatusEventType::Complete);
}

#[tokio::test]
async fn test_completion_claim_requires_an_action() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        "Thought: let me think about lesson 4",
        "Finish: I created lesson 4",
        r#"Action: {"tool_name": "write_file", "params": {"path": "lesson4.json", "content": "{}"}}"#,
        "Finish: I created lesson 4",
        "Finish: I created lesson 4",
    ]);
    let agent = agent_with(&provider, settings(10), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t2", "Create lesson 4", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.summary.as_deref(), Some("I created lesson 4"));
    assert_eq!(guards(&sink.events()), vec!["no_action", "hallucination"]);
    assert!(dir.path().join("lesson4.json").exists());
}

#[tokio::test]
async fn test_incomplete_plan_blocks_finish_until_all_steps_complete() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        CREATE_PLAN,
        r#"Thought: first two steps are done.
Action: {"tool_name": "update_plan_step", "params": {"step_number": 1, "status": "complete"}}
Action: {"tool_name": "update_plan_step", "params": {"step_number": 2, "status": "complete"}}"#,
        "Finish: Added five food words",
        r#"Action: {"tool_name": "update_plan_step", "params": {"step_number": 3, "status": "complete"}}"#,
        "Finish: Added five food words",
        "Finish: Added five food words",
    ]);
    let agent = agent_with(&provider, settings(20), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t3", "Add food words", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.iterations, 6);
    assert!(!agent.plans().has_incomplete());

    let events = sink.events();
    let rejection = of_type(&events, StatusEventType::Observation)
        .into_iter()
        .find(|e| e.data["guard"] == "incomplete_plan")
        .expect("plan rejection");
    let message = rejection.data["message"].as_str().unwrap();
    assert!(message.contains("Save lesson"));
    assert!(message.contains("pending"));
    assert!(!message.contains("Read lesson"));

    // 세 번째 Action 반복 뒤 회고
    assert_eq!(of_type(&events, StatusEventType::Reflection).len(), 1);
    assert_eq!(of_type(&events, StatusEventType::FinishReflection).len(), 1);
}

#[tokio::test]
async fn test_action_after_verification_requires_new_verification() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        LIST_FILES,
        "Finish: looked around",
        LIST_FILES,
        "Finish: looked around",
        "Finish: looked around",
    ]);
    let agent = agent_with(&provider, settings(20), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t4", "Inspect", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.iterations, 5);
    assert_eq!(of_type(&sink.events(), StatusEventType::FinishReflection).len(), 2);
}

#[tokio::test]
async fn test_finish_accepted_without_verification_when_budget_is_exhausted() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([LIST_FILES, LIST_FILES, "Finish: done"]);
    let agent = agent_with(&provider, settings(3), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t5", "Inspect", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.iterations, 3);
    assert!(of_type(&sink.events(), StatusEventType::FinishReflection).is_empty());
}

#[tokio::test]
async fn test_max_iterations_is_a_successful_terminal_state() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([LIST_FILES, LIST_FILES]);
    let agent = agent_with(&provider, settings(2), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t6", "Inspect", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
    assert!(outcome.status.is_success());
    assert_eq!(outcome.iterations, 2);
    let last = sink.events().pop().unwrap();
    assert_eq!(last.event_type, StatusEventType::MaxIterations);
    assert_eq!(last.data["iterations"], 2);
}

#[tokio::test]
async fn test_llm_failure_fails_the_run() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([LIST_FILES]);
    provider.push(ScriptStep::Fail(ProviderError::Authentication(
        "invalid key".into(),
    )));
    let agent = agent_with(&provider, settings(10), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t7", "Inspect", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.error.unwrap().contains("invalid key"));
    let last = sink.events().pop().unwrap();
    assert_eq!(last.event_type, StatusEventType::Error);
    assert_eq!(last.data["iterations"], 2);
}

#[tokio::test]
async fn test_cancel_during_llm_call_stops_before_tool_dispatch() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        r#"Action: {"tool_name": "write_file", "params": {"path": "late.json", "content": "{}"}}"#,
    ])
    .with_delay(Duration::from_millis(300));
    let agent = agent_with(&provider, settings(10), dir.path());
    let sink = CollectingSink::new();
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();

    let (outcome, _) = tokio::join!(
        agent.run("t8", "Write", &sink, &cancel),
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        }
    );

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(provider.call_count(), 1);
    assert!(!dir.path().join("late.json").exists());

    let events = sink.events();
    assert!(of_type(&events, StatusEventType::Action).is_empty());
    assert_eq!(of_type(&events, StatusEventType::CostUpdate).len(), 1);
    let last = events.last().unwrap();
    assert_eq!(last.event_type, StatusEventType::Cancelled);
    assert_eq!(last.data["iterations"], 1);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([LIST_FILES]);
    let agent = agent_with(&provider, settings(10), dir.path());
    let sink = CollectingSink::new();
    let cancel = CancelHandle::new();
    cancel.cancel();

    let outcome = agent.run("t9", "Inspect", &sink, &cancel).await;

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_multiple_actions_run_in_order() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        r#"Thought: write then read back.
Action: {"tool_name": "write_file", "params": {"path": "words.json", "content": "[\"hola\"]"}}
Action: {"tool_name": "read_file", "params": {"path": "words.json"}}"#,
        r#"Action: {"tool_name": "teleport", "params": {}}"#,
    ]);
    let agent = agent_with(&provider, settings(2), dir.path());
    let sink = CollectingSink::new();

    agent.run("t10", "Write words", &sink, &CancelHandle::new()).await;

    let events = sink.events();
    let tools: Vec<String> = of_type(&events, StatusEventType::Action)
        .iter()
        .map(|e| e.data["tool"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(tools, vec!["write_file", "read_file", "teleport"]);

    let second_prompt = &provider.prompts()[1];
    assert!(second_prompt.contains("Observation 1 (write_file):"));
    assert!(second_prompt.contains("Observation 2 (read_file):"));
    assert!(second_prompt.contains("hola"));
    assert!(second_prompt.ends_with("[Iteration 2/2]"));

    // 알 수 없는 도구는 실패 관찰일 뿐 루프를 멈추지 않음
    let last_observation = of_type(&events, StatusEventType::Observation).pop().unwrap();
    assert_eq!(last_observation.data["success"], false);
}

#[tokio::test]
async fn test_cost_tracking_uses_pricing_table() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([LIST_FILES]);
    let agent = agent_with(&provider, settings(1), dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t11", "Inspect", &sink, &CancelHandle::new()).await;

    assert!(outcome.input_tokens > 0);
    assert!(outcome.total_cost > 0.0);
    let update = of_type(&sink.events(), StatusEventType::CostUpdate).pop().unwrap();
    assert_eq!(update.data["total_input_tokens"], outcome.input_tokens);
}

#[tokio::test]
async fn test_context_is_compacted_during_run() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::new([
        CREATE_PLAN,
        LIST_FILES,
        LIST_FILES,
        "Created a three-step plan and listed the workspace twice.",
    ]);
    let mut config = settings(3).with_compaction(CompactionSettings {
        min_turns: 2,
        token_threshold: 10,
        keep_recent_pairs: 1,
        max_turn_chars: 500,
        target_ratio: 0.3,
    });
    config.reflection_interval = 100;
    let agent = agent_with(&provider, config, dir.path());
    let sink = CollectingSink::new();

    let outcome = agent.run("t12", "Add food words", &sink, &CancelHandle::new()).await;

    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
    let events = sink.events();
    assert_eq!(of_type(&events, StatusEventType::ContextSummarization).len(), 1);
    let done = of_type(&events, StatusEventType::ContextSummarized).pop().unwrap();
    assert_eq!(done.data["summarized"], true);
    assert!(done.data["plan_fragments"].as_u64().unwrap() >= 1);
    assert_eq!(done.data["turns_after"], 5);

    // 요약 호출도 비용에 포함
    assert_eq!(of_type(&events, StatusEventType::CostUpdate).len(), 4);
    assert!(provider.prompts()[3].contains("compressing"));
}
