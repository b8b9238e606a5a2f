//! Non-interactive run mode
//!
//! 태스크 레코드를 저장소에 만들고 에이전트를 이 프로세스에서 실행합니다.
//! 이벤트는 터미널에 출력하는 동시에 레코드에 기록되므로 `lingo tasks show`로 다시 볼 수 있습니다.

use lingo_agent::{Agent, CancelHandle, PromptTemplates};
use lingo_foundation::{ChannelSink, LingoConfig, PricingTable, StatusEvent, StatusEventType};
use lingo_provider::create_provider;
use lingo_task::TaskStore;
use serde_json::Value;

/// Run a single prompt; returns whether the task succeeded
pub async fn run_once(config: &LingoConfig, prompt: &str) -> anyhow::Result<bool> {
    let settings = config.agent.clone();
    let provider = create_provider(&config.provider, &settings.model)?;
    let templates = PromptTemplates::load(config.templates_dir.as_deref())?;
    let pricing = PricingTable::default().with_overrides(&config.pricing);

    let store = TaskStore::new(config.server.tasks_dir());
    let record = store.create(prompt, settings.clone())?;
    let task_id = record.id.to_string();
    println!("Lingo - task {}\n", record.id.short());

    let agent = Agent::new(provider, settings)
        .with_tool_settings(config.tools.clone())
        .with_pricing(pricing)
        .with_templates(templates);

    // Ctrl-C → 협조적 취소
    let cancel = CancelHandle::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            on_signal.cancel();
        }
    });

    let (sink, mut rx) = ChannelSink::channel();
    let recorder_store = store.clone();
    let record_id = record.id;
    let event_handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = format_event(&event) {
                println!("{}", line);
            }
            let store = recorder_store.clone();
            let saved = tokio::task::spawn_blocking(move || store.append_event(&record_id, &event))
                .await;
            if let Ok(Err(e)) = saved {
                tracing::warn!(task_id = %record_id, error = %e, "Failed to record event");
            }
        }
    });

    let outcome = agent.run(&task_id, prompt, &sink, &cancel).await;
    drop(sink);
    let _ = event_handle.await;

    println!(
        "\n[Iterations: {} | Tokens: {} in, {} out | Cost: ${:.4}]",
        outcome.iterations, outcome.input_tokens, outcome.output_tokens, outcome.total_cost
    );
    Ok(outcome.status.is_success())
}

/// 이벤트 한 줄 요약. 출력하지 않을 이벤트는 None
pub fn format_event(event: &StatusEvent) -> Option<String> {
    let data = &event.data;
    let text = |key: &str| data.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let number = |key: &str| data.get(key).and_then(Value::as_u64).unwrap_or_default();

    let line = match event.event_type {
        StatusEventType::Start => format!("▶ {} (model: {})", text("task"), text("model")),
        StatusEventType::Iteration => format!(
            "── Iteration {}/{}",
            number("iteration"),
            number("max_iterations")
        ),
        StatusEventType::Thought => format!("💭 {}", truncate(&text("thought"), 200)),
        StatusEventType::Action => format!("[{}] Running...", text("tool")),
        StatusEventType::Observation => {
            if data.get("guard").is_some() {
                format!("⚠ {}", truncate(&text("message"), 200))
            } else {
                let success = data.get("success").and_then(Value::as_bool).unwrap_or(false);
                let result = data.get("result").cloned().unwrap_or_default();
                let detail = if success {
                    result.get("content").and_then(Value::as_str).unwrap_or_default()
                } else {
                    result.get("error").and_then(Value::as_str).unwrap_or_default()
                };
                let status = if success { "✓" } else { "✗" };
                format!("[{}] {} {}", text("tool"), status, truncate(detail, 100))
            }
        }
        StatusEventType::Reflection | StatusEventType::FinishReflection => {
            "↻ Reflecting on progress".to_string()
        }
        StatusEventType::ContextSummarized => format!(
            "… Context compacted ({} → {} turns)",
            number("turns_before"),
            number("turns_after")
        ),
        StatusEventType::Complete => format!("\n✓ {}", text("summary")),
        StatusEventType::MaxIterations => format!("\n⏱ {}", text("summary")),
        StatusEventType::Cancelled => "\n⊘ Cancelled".to_string(),
        StatusEventType::Error => format!("\n✗ Error: {}", text("error")),
        StatusEventType::CostUpdate | StatusEventType::ContextSummarization => return None,
    };
    Some(line)
}

/// Truncate a string for display
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: StatusEventType, data: Value) -> StatusEvent {
        StatusEvent::new("t", kind).with_data(data)
    }

    #[test]
    fn test_format_tool_observation() {
        let line = format_event(&event(
            StatusEventType::Observation,
            json!({"tool": "read_file", "success": true, "result": {"content": "line1\nline2"}}),
        ))
        .unwrap();
        assert_eq!(line, "[read_file] ✓ line1 line2");
    }

    #[test]
    fn test_format_guard_observation() {
        let line = format_event(&event(
            StatusEventType::Observation,
            json!({"guard": "first_iteration", "message": "Not yet"}),
        ))
        .unwrap();
        assert_eq!(line, "⚠ Not yet");
    }

    #[test]
    fn test_cost_updates_are_silent() {
        assert!(format_event(&event(StatusEventType::CostUpdate, json!({}))).is_none());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("안녕하세요", 2), "안녕...");
        assert_eq!(truncate("short", 10), "short");
    }
}
