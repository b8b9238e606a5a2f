//! delete_file - remove a single file

use super::{display_relative, resolve_in_workspace};
use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::Result;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DeleteFileParams {
    #[serde(alias = "file_path")]
    pub path: String,
}

/// Delete tool (files only, never directories)
#[derive(Debug, Default)]
pub struct DeleteFileTool;

impl DeleteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    type Params = DeleteFileParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder("delete_file", "Delete one file in the workspace.")
            .string_param("path", "Path relative to the workspace root", true)
            .build()
    }

    async fn call(&self, ctx: &ToolContext, params: DeleteFileParams) -> Result<ToolResult> {
        let file_path = resolve_in_workspace(&ctx.workspace_root, &params.path)?;
        let shown = display_relative(&ctx.workspace_root, &file_path);

        if !file_path.is_file() {
            return Ok(ToolResult::error(format!("Not a file: {}", shown)));
        }

        tokio::fs::remove_file(&file_path).await?;
        info!(task_id = %ctx.task_id, path = %shown, "File deleted");
        Ok(ToolResult::success_with_metadata(
            format!("Deleted {}", shown),
            serde_json::json!({ "path": shown }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynTool;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_delete_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("old.json"), "{}").unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = DeleteFileTool::new()
            .execute(&ctx, json!({"path": "old.json"}))
            .await;
        assert!(result.success);
        assert!(!dir.path().join("old.json").exists());
    }

    #[tokio::test]
    async fn test_refuses_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("unit1")).unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = DeleteFileTool::new()
            .execute(&ctx, json!({"path": "unit1"}))
            .await;
        assert!(!result.success);
        assert!(dir.path().join("unit1").exists());
    }
}
