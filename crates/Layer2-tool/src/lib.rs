//! # lingo-tool
//!
//! Tool system for Lingo providing:
//! - Tool trait (typed parameters) and registry
//! - Plan store shared by the planning tools
//! - Builtin tools: plans, workspace files, commands, read-only SQL

pub mod builtin;
pub mod plan;
pub mod registry;
pub mod r#trait;

pub use r#trait::{
    DynTool, Tool, ToolContext, ToolDef, ToolParameters, ToolResult, INVALID_PARAMETERS,
    UNKNOWN_TOOL,
};
pub use registry::ToolRegistry;

pub use plan::{Plan, PlanStatus, PlanStore, Step, StepStatus};

// Re-export builtin tools
pub use builtin::{
    command::RunCommandTool,
    delete::DeleteFileTool,
    glob::ListFilesTool,
    plan::{CreatePlanTool, GetPlanStatusTool, UpdatePlanStepTool},
    query::QueryDatabaseTool,
    read::ReadFileTool,
    write::WriteFileTool,
};
