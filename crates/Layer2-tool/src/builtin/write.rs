//! write_file - create or overwrite a file

use super::{display_relative, resolve_in_workspace};
use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// `content`는 문자열이 일반적이지만, 모델이 JSON 객체를 그대로 넘기는 경우도 받습니다.
#[derive(Debug, Deserialize)]
pub struct WriteFileParams {
    #[serde(alias = "file_path")]
    pub path: String,
    pub content: Value,
}

impl WriteFileParams {
    fn text(&self) -> Result<String> {
        Ok(match &self.content {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)?,
        })
    }
}

/// Write tool
#[derive(Debug, Default)]
pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    type Params = WriteFileParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "write_file",
            "Create a file or completely overwrite an existing one. Parent directories are created.",
        )
        .string_param("path", "Path relative to the workspace root", true)
        .string_param("content", "The complete file content", true)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: WriteFileParams) -> Result<ToolResult> {
        let file_path = resolve_in_workspace(&ctx.workspace_root, &params.path)?;
        let shown = display_relative(&ctx.workspace_root, &file_path);
        let content = params.text()?;

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let is_new = !file_path.exists();
        tokio::fs::write(&file_path, &content).await?;
        info!(task_id = %ctx.task_id, path = %shown, bytes = content.len(), "File written");

        Ok(ToolResult::success_with_metadata(
            format!(
                "{} file: {} ({} lines, {} bytes)",
                if is_new { "Created" } else { "Wrote" },
                shown,
                content.lines().count(),
                content.len()
            ),
            serde_json::json!({
                "path": shown,
                "created": is_new,
                "bytes": content.len()
            }),
        ))
    }
}
