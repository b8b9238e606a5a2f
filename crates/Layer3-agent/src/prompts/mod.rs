//! Prompt templates
//!
//! 기본 템플릿은 바이너리에 포함되어 있고, 설정의 `templatesDir`에 같은 이름의
//! 파일이 있으면 그 파일이 우선합니다. 자리 표시자는 `{name}` 형식입니다.

use lingo_foundation::{Error, Result};
use std::path::Path;
use tracing::debug;

pub const SYSTEM_TEMPLATE: &str = include_str!("system.md");
pub const FINISH_VERIFICATION_TEMPLATE: &str = include_str!("finish_verification.md");
pub const REFLECTION_TEMPLATE: &str = include_str!("reflection.md");
pub const SUMMARIZE_TEMPLATE: &str = include_str!("summarize.md");

// ============================================================================
// Injected observations
// ============================================================================

pub const FIRST_ITERATION_FINISH: &str = "Observation: You cannot finish on the first iteration. \
You have not taken any action yet. Start by creating a plan with create_plan, then work through it with tool calls.";

pub const HALLUCINATED_FINISH: &str = "Observation: Your summary claims changes were made, \
but no tool has been called in this task. Nothing has been created, edited or saved yet. \
Make the changes with real tool calls before finishing.";

pub const NO_ACTION_NUDGE: &str = "Observation: Your response contained no Action. \
Always continue with an Action line (a tool call), or a Finish line if the task is complete.";

pub const SUMMARY_MARKER: &str = "[Context summary of earlier steps]";
pub const PLAN_DATA_MARKER: &str = "[Preserved plan data]";

/// 미완료 계획 거부 메시지
pub fn incomplete_plan_message(report: &str) -> String {
    format!(
        "Observation: You cannot finish yet. The plan has incomplete steps:\n{}\n\
Complete these steps (and mark them with update_plan_step) before finishing.",
        report
    )
}

// ============================================================================
// Templates
// ============================================================================

/// Prompt templates used by one agent
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub system: String,
    pub finish_verification: String,
    pub reflection: String,
    pub summarize: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: SYSTEM_TEMPLATE.to_string(),
            finish_verification: FINISH_VERIFICATION_TEMPLATE.to_string(),
            reflection: REFLECTION_TEMPLATE.to_string(),
            summarize: SUMMARIZE_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// 디렉터리의 `system.md`, `finish_verification.md`, `reflection.md`,
    /// `summarize.md`로 기본값을 덮어씀
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut templates = Self::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        let slots: [(&str, &mut String); 4] = [
            ("system.md", &mut templates.system),
            ("finish_verification.md", &mut templates.finish_verification),
            ("reflection.md", &mut templates.reflection),
            ("summarize.md", &mut templates.summarize),
        ];
        for (name, slot) in slots {
            let path = dir.join(name);
            if path.is_file() {
                *slot = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read template {}: {}", path.display(), e))
                })?;
                debug!(template = name, path = %path.display(), "Loaded template override");
            }
        }
        Ok(templates)
    }
}

/// `{key}` 자리 표시자 치환. 모르는 자리 표시자는 그대로 둠
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_replaces_known_keys() {
        let text = render("Task: {task} / {unknown}", &[("task", "add words".into())]);
        assert_eq!(text, "Task: add words / {unknown}");
    }

    #[test]
    fn test_default_templates_have_placeholders() {
        let t = PromptTemplates::default();
        assert!(t.system.contains("{tools}") && t.system.contains("{task}"));
        assert!(t.finish_verification.contains("{summary}"));
        assert!(t.reflection.contains("{plan_status}"));
        assert!(t.summarize.contains("{turns}"));
    }

    #[test]
    fn test_directory_override() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("reflection.md"), "custom {iteration}").unwrap();
        let t = PromptTemplates::load(Some(dir.path())).unwrap();
        assert_eq!(t.reflection, "custom {iteration}");
        assert_eq!(t.system, SYSTEM_TEMPLATE);
    }
}
