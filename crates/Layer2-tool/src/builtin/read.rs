//! read_file - read a lesson/content file

use super::{display_relative, resolve_in_workspace};
use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::Result;
use serde::Deserialize;

/// Maximum file size to read (512KB)
const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Default line limit
const DEFAULT_LINE_LIMIT: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ReadFileParams {
    #[serde(alias = "file_path")]
    pub path: String,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Read tool
#[derive(Debug, Default)]
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    type Params = ReadFileParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "read_file",
            "Read a file in the workspace (lesson JSON, CSV, text). Returns the content as text.",
        )
        .string_param("path", "Path relative to the workspace root", true)
        .integer_param("offset", "Line number to start from (1-based, default: 1)", false)
        .integer_param("limit", "Maximum number of lines (default: 2000)", false)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: ReadFileParams) -> Result<ToolResult> {
        let file_path = resolve_in_workspace(&ctx.workspace_root, &params.path)?;
        let shown = display_relative(&ctx.workspace_root, &file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(_) => return Ok(ToolResult::error(format!("File not found: {}", shown))),
        };
        if !metadata.is_file() {
            return Ok(ToolResult::error(format!(
                "Path is not a file: {}. Use 'list_files' to list directories.",
                shown
            )));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Ok(ToolResult::error(format!(
                "File too large ({} bytes). Maximum size is {} bytes.",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let content = tokio::fs::read_to_string(&file_path).await?;

        let offset = params.offset.unwrap_or(1).saturating_sub(1);
        let limit = params.limit.unwrap_or(DEFAULT_LINE_LIMIT);
        let total_lines = content.lines().count();
        let selected: Vec<&str> = content.lines().skip(offset).take(limit).collect();
        let truncated = total_lines > offset + limit;

        Ok(ToolResult::success_with_metadata(
            ctx.truncate_output(&selected.join("\n")),
            serde_json::json!({
                "path": shown,
                "total_lines": total_lines,
                "showing_lines": format!("{}-{}", offset + 1, offset + selected.len()),
                "truncated": truncated
            }),
        ))
    }
}
