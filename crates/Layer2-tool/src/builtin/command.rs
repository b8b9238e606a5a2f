//! run_command - run a program inside the workspace
//!
//! 셸을 거치지 않습니다. 명령 문자열은 `shlex`로 인자 배열로 나눈 뒤 직접 실행하므로
//! 파이프, 리다이렉션, `&&` 같은 셸 문법은 동작하지 않습니다.

use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::{Error, Result};
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// Maximum timeout in seconds
const MAX_TIMEOUT_SECS: u64 = 600;

/// Programs that are never run
const BLOCKED_PROGRAMS: &[&str] = &[
    "rm", "sudo", "su", "curl", "wget", "nc", "telnet", "ssh", "scp", "dd", "mkfs", "shutdown",
    "reboot",
];

#[derive(Debug, Deserialize)]
pub struct RunCommandParams {
    #[serde(alias = "cmd")]
    pub command: String,
    /// Timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Command tool
#[derive(Debug, Default)]
pub struct RunCommandTool;

impl RunCommandTool {
    pub fn new() -> Self {
        Self
    }

    fn split(command: &str) -> Result<Vec<String>> {
        let argv = shlex::split(command)
            .ok_or_else(|| Error::InvalidInput(format!("Cannot parse command: {}", command)))?;
        if argv.is_empty() {
            return Err(Error::InvalidInput("command must not be empty".into()));
        }

        let program = std::path::Path::new(&argv[0])
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if BLOCKED_PROGRAMS.contains(&program.as_str()) {
            return Err(Error::InvalidInput(format!(
                "Command '{}' is blocked",
                program
            )));
        }
        Ok(argv)
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    type Params = RunCommandParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "run_command",
            "Run a program in the workspace root (e.g., a lesson validation script). No shell: pipes and redirects are not supported.",
        )
        .string_param("command", "Program and arguments, e.g. 'python3 scripts/check.py lesson.json'", true)
        .integer_param("timeout", "Timeout in seconds (max 600)", false)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: RunCommandParams) -> Result<ToolResult> {
        let argv = Self::split(params.command.trim())?;
        let limit = params
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(ctx.command_timeout)
            .min(Duration::from_secs(MAX_TIMEOUT_SECS));

        debug!(task_id = %ctx.task_id, program = %argv[0], args = argv.len() - 1, "Running command");

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(&ctx.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(limit, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ToolResult::error(format!(
                    "Failed to execute '{}': {}",
                    argv[0], e
                )))
            }
            Err(_) => {
                return Ok(ToolResult::error(format!(
                    "Command timed out after {} seconds",
                    limit.as_secs()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut content = String::new();
        if !stdout.is_empty() {
            content.push_str(&ctx.truncate_output(&stdout));
        }
        if !stderr.is_empty() {
            if !content.is_empty() {
                content.push_str("\n\n--- stderr ---\n");
            }
            content.push_str(&ctx.truncate_output(&stderr));
        }
        if content.is_empty() {
            content = "(no output)".to_string();
        }

        let exit_code = output.status.code();
        info!(task_id = %ctx.task_id, program = %argv[0], exit_code = ?exit_code, "Command finished");

        let metadata = serde_json::json!({ "exit_code": exit_code });
        if output.status.success() {
            Ok(ToolResult::success_with_metadata(content, metadata))
        } else {
            Ok(ToolResult {
                metadata: Some(metadata),
                content,
                ..ToolResult::error(format!("Command exited with status {:?}", exit_code))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynTool;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_split_quotes() {
        let argv = RunCommandTool::split("python3 check.py 'unit 1/lesson.json'").unwrap();
        assert_eq!(argv, vec!["python3", "check.py", "unit 1/lesson.json"]);
    }

    #[test]
    fn test_blocked_program() {
        assert!(RunCommandTool::split("rm -rf /").is_err());
        assert!(RunCommandTool::split("/usr/bin/sudo ls").is_err());
        assert!(RunCommandTool::split("").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_workspace_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = RunCommandTool::new()
            .execute(&ctx, json!({"command": "ls"}))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert!(result.content.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure_with_output() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = RunCommandTool::new()
            .execute(&ctx, json!({"command": "ls does-not-exist"}))
            .await;
        assert!(!result.success);
        assert!(!result.content.is_empty());
        assert!(result.metadata.unwrap()["exit_code"].is_number());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = RunCommandTool::new()
            .execute(&ctx, json!({"command": "sleep 5", "timeout": 1}))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }
}
