//! list_files - find files by glob pattern

use super::resolve_in_workspace;
use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Maximum number of results to return
const MAX_RESULTS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Base directory (default: workspace root)
    #[serde(default, alias = "directory")]
    pub path: Option<String>,
}

fn default_pattern() -> String {
    "*".to_string()
}

/// Glob tool
#[derive(Debug, Default)]
pub struct ListFilesTool;

impl ListFilesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    type Params = ListFilesParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "list_files",
            "List files matching a glob pattern. Returns workspace-relative paths.",
        )
        .string_param(
            "pattern",
            "Glob pattern (e.g., '**/*.json', 'lessons/unit1/*'). Default: '*'",
            false,
        )
        .string_param("path", "Base directory (default: workspace root)", false)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: ListFilesParams) -> Result<ToolResult> {
        if Path::new(&params.pattern).is_absolute() || params.pattern.contains("..") {
            return Err(Error::InvalidInput(
                "pattern must be relative to the workspace".into(),
            ));
        }

        let base = match params.path.as_deref() {
            Some(p) => resolve_in_workspace(&ctx.workspace_root, p)?,
            None => ctx.workspace_root.clone(),
        };
        let full_pattern = base.join(&params.pattern);
        let pattern_str = full_pattern.to_string_lossy().to_string();

        let paths = glob::glob(&pattern_str)
            .map_err(|e| Error::InvalidInput(format!("Invalid glob pattern: {}", e)))?;

        let mut results: Vec<String> = Vec::new();
        let mut error_count = 0;
        for entry in paths {
            if results.len() >= MAX_RESULTS {
                break;
            }
            match entry {
                Ok(path) => {
                    let shown = path
                        .strip_prefix(&ctx.workspace_root)
                        .map(|p| p.to_path_buf())
                        .unwrap_or(path);
                    results.push(shown.display().to_string());
                }
                Err(_) => error_count += 1,
            }
        }
        results.sort();

        let truncated = results.len() >= MAX_RESULTS;
        let content = if results.is_empty() {
            "No files found matching pattern.".to_string()
        } else if truncated {
            format!(
                "{}\n\n... (showing first {} matches, more may exist)",
                results.join("\n"),
                MAX_RESULTS
            )
        } else {
            results.join("\n")
        };

        Ok(ToolResult::success_with_metadata(
            content,
            serde_json::json!({
                "matches": results.len(),
                "pattern": params.pattern,
                "truncated": truncated,
                "errors": error_count
            }),
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
    async fn test_lists_sorted_relative_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("unit1")).unwrap();
        std::fs::write(dir.path().join("unit1/b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("unit1/a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("unit1/notes.txt"), "").unwrap();
        let ctx = ToolContext::new("t", dir.path());

        let result = ListFilesTool::new()
            .execute(&ctx, json!({"pattern": "unit1/*.json"}))
            .await;
        assert!(result.success);
        assert_eq!(result.content, "unit1/a.json\nunit1/b.json");
    }

    #[tokio::test]
    async fn test_parent_pattern_rejected() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("t", dir.path());
        let result = ListFilesTool::new()
            .execute(&ctx, json!({"pattern": "../*"}))
            .await;
        assert!(!result.success);
    }
}
