//! Tool trait and related types
//!
//! 도구는 `Tool`을 구현하면서 파라미터 타입(`Params`)을 선언합니다.
//! 레지스트리는 객체 안전한 `DynTool`을 통해 JSON 파라미터를 역직렬화한 뒤
//! 핸들러를 호출하므로, 형식이 잘못된 호출은 핸들러에 도달하기 전에
//! `invalid_parameters` 결과로 돌아갑니다.

use async_trait::async_trait;
use lingo_foundation::{Result, ToolSettings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// `error_kind` for parameter validation failures
pub const INVALID_PARAMETERS: &str = "invalid_parameters";

/// `error_kind` for unknown tool names
pub const UNKNOWN_TOOL: &str = "unknown_tool";

// ============================================================================
// ToolDef
// ============================================================================

/// Tool description shown to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (unique identifier)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for parameters
    pub parameters: ToolParameters,
}

/// Parameters schema for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    /// Type (usually "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Properties (parameter definitions)
    pub properties: Value,

    /// Required parameters
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolDef {
    /// Create a new tool definition builder
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolDefBuilder {
        ToolDefBuilder::new(name, description)
    }

    /// 프롬프트용 한 줄 요약 + 파라미터 스키마
    pub fn to_prompt(&self) -> String {
        let schema = serde_json::to_string(&self.parameters).unwrap_or_default();
        format!("- {}: {}\n  Parameters: {}", self.name, self.description, schema)
    }
}

/// Builder for ToolDef
pub struct ToolDefBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ToolDefBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    fn param(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a string parameter
    pub fn string_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({"type": "string", "description": description.into()});
        self.param(name, schema, required)
    }

    /// Add an integer parameter
    pub fn integer_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({"type": "integer", "description": description.into()});
        self.param(name, schema, required)
    }

    /// Add an enum parameter
    pub fn enum_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({
            "type": "string",
            "description": description.into(),
            "enum": values
        });
        self.param(name, schema, required)
    }

    /// Add an array-of-strings parameter
    pub fn string_array_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({
            "type": "array",
            "items": {"type": "string"},
            "description": description.into()
        });
        self.param(name, schema, required)
    }

    /// Build the ToolDef
    pub fn build(self) -> ToolDef {
        ToolDef {
            name: self.name,
            description: self.description,
            parameters: ToolParameters {
                schema_type: "object".to_string(),
                properties: Value::Object(self.properties),
                required: self.required,
            },
        }
    }
}

// ============================================================================
// ToolContext
// ============================================================================

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Owning task
    pub task_id: String,

    /// 파일 도구가 접근할 수 있는 루트
    pub workspace_root: PathBuf,

    /// 레슨/어휘 SQLite 파일
    pub database_path: Option<PathBuf>,

    /// run_command 타임아웃
    pub command_timeout: Duration,

    /// 도구 출력 최대 문자 수
    pub max_output_chars: usize,
}

impl ToolContext {
    pub fn new(task_id: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        let defaults = ToolSettings::default();
        Self {
            task_id: task_id.into(),
            workspace_root: workspace_root.into(),
            database_path: None,
            command_timeout: Duration::from_secs(defaults.command_timeout_secs),
            max_output_chars: defaults.max_output_chars,
        }
    }

    /// 설정에서 생성
    pub fn from_settings(task_id: impl Into<String>, settings: &ToolSettings) -> Self {
        Self {
            task_id: task_id.into(),
            workspace_root: settings.workspace_root(),
            database_path: settings.database_path.clone(),
            command_timeout: Duration::from_secs(settings.command_timeout_secs),
            max_output_chars: settings.max_output_chars,
        }
    }

    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// 출력 길이 제한 (앞뒤 절반씩 유지)
    pub fn truncate_output(&self, output: &str) -> String {
        let total = output.chars().count();
        if total <= self.max_output_chars {
            return output.to_string();
        }

        let half = self.max_output_chars / 2;
        let start: String = output.chars().take(half).collect();
        let end: String = output.chars().skip(total - half).collect();

        format!(
            "{}\n\n... [truncated {} characters] ...\n\n{}",
            start,
            total - self.max_output_chars,
            end
        )
    }
}

// ============================================================================
// ToolResult
// ============================================================================

/// Result of tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution was successful
    pub success: bool,

    /// Result content (text output)
    pub content: String,

    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// 실패 분류 (`invalid_parameters`, `unknown_tool`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ToolResult {
    /// Create a success result
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            metadata: None,
            error: None,
            error_kind: None,
        }
    }

    /// Create a success result with metadata
    pub fn success_with_metadata(content: impl Into<String>, metadata: Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::success(content)
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            metadata: None,
            error: Some(message.into()),
            error_kind: None,
        }
    }

    /// Parameter validation failure
    pub fn invalid_parameters(tool: &str, message: impl std::fmt::Display) -> Self {
        Self {
            error_kind: Some(INVALID_PARAMETERS.to_string()),
            ..Self::error(format!("Invalid parameters for '{}': {}", tool, message))
        }
    }

    /// Unknown tool name
    pub fn unknown_tool(name: &str, available: &[String]) -> Self {
        Self {
            error_kind: Some(UNKNOWN_TOOL.to_string()),
            ..Self::error(format!(
                "Unknown tool '{}'. Available tools: {}",
                name,
                available.join(", ")
            ))
        }
    }

    /// JSON map form used in observations
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"success": self.success}))
    }
}

// ============================================================================
// Tool / DynTool
// ============================================================================

/// Tool trait - implement this to create a new tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// 파라미터 타입. 레지스트리가 JSON 맵에서 역직렬화합니다.
    type Params: DeserializeOwned + Send + 'static;

    /// Get the tool definition
    fn definition(&self) -> ToolDef;

    /// Run the tool with validated parameters
    ///
    /// 반환된 `Err`는 레지스트리에서 `{success: false, error}` 결과로 바뀝니다.
    async fn call(&self, ctx: &ToolContext, params: Self::Params) -> Result<ToolResult>;
}

/// Object-safe tool interface used by the registry
#[async_trait]
pub trait DynTool: Send + Sync {
    fn definition(&self) -> ToolDef;

    fn name(&self) -> String {
        self.definition().name
    }

    /// Validate parameters and run
    async fn execute(&self, ctx: &ToolContext, params: Value) -> ToolResult;
}

#[async_trait]
impl<T> DynTool for T
where
    T: Tool,
{
    fn definition(&self) -> ToolDef {
        Tool::definition(self)
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> ToolResult {
        let name = DynTool::name(self);
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let typed: T::Params = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                debug!(tool = %name, error = %e, "Parameter validation failed");
                return ToolResult::invalid_parameters(&name, e);
            }
        };

        match self.call(ctx, typed).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, task_id = %ctx.task_id, error = %e, "Tool failed");
                ToolResult::error(e.to_string())
            }
        }
    }
}
