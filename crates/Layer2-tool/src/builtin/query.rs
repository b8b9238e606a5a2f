//! query_database - read-only SQL against the lesson/vocabulary database
//!
//! 연결은 읽기 전용 플래그로 열고, 준비된 문장이 `readonly()`가 아니면 거부합니다.
//! rusqlite 호출은 블로킹이므로 `spawn_blocking`에서 실행합니다.

use crate::{Tool, ToolContext, ToolDef, ToolResult};
use async_trait::async_trait;
use lingo_foundation::{Error, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default row limit
const DEFAULT_ROW_LIMIT: usize = 100;

/// Maximum row limit
const MAX_ROW_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct QueryDatabaseParams {
    #[serde(alias = "query")]
    pub sql: String,
    /// Positional `?` parameters
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Database query tool
#[derive(Debug, Default)]
pub struct QueryDatabaseTool;

impl QueryDatabaseTool {
    pub fn new() -> Self {
        Self
    }
}

/// 쿼리 결과
#[derive(Debug)]
struct QueryOutput {
    columns: Vec<String>,
    rows: Vec<Value>,
    truncated: bool,
}

fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

/// 블로킹 쿼리 실행
fn run_query(path: &Path, sql: &str, params: &[Value], limit: usize) -> Result<QueryOutput> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(Error::InvalidInput(
            "only read-only statements (SELECT) are allowed".into(),
        ));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let bound: Vec<rusqlite::types::Value> = params.iter().map(to_sql_value).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;

    let mut out = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows.next()? {
        if out.len() >= limit {
            truncated = true;
            break;
        }
        let mut record = Map::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), from_sql_value(row.get_ref(i)?));
        }
        out.push(Value::Object(record));
    }

    Ok(QueryOutput {
        columns,
        rows: out,
        truncated,
    })
}

#[async_trait]
impl Tool for QueryDatabaseTool {
    type Params = QueryDatabaseParams;

    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            "query_database",
            "Run a read-only SQL query (SELECT) against the lesson/vocabulary database. Returns rows as JSON objects.",
        )
        .string_param("sql", "SELECT statement; use ? for parameters", true)
        .string_array_param("params", "Positional parameters for ? placeholders", false)
        .integer_param("limit", "Maximum rows (default: 100, max: 1000)", false)
        .build()
    }

    async fn call(&self, ctx: &ToolContext, params: QueryDatabaseParams) -> Result<ToolResult> {
        let path: PathBuf = match ctx.database_path.clone() {
            Some(path) => path,
            None => return Ok(ToolResult::error("No database is configured (tools.databasePath)")),
        };
        if !path.exists() {
            return Ok(ToolResult::error(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let limit = params.limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);
        debug!(task_id = %ctx.task_id, sql = %params.sql, "Querying database");

        let output = tokio::task::spawn_blocking(move || {
            run_query(&path, &params.sql, &params.params, limit)
        })
        .await
        .map_err(|e| Error::Internal(format!("query task failed: {}", e)))??;

        let rows_json = serde_json::to_string_pretty(&output.rows)?;
        Ok(ToolResult::success_with_metadata(
            ctx.truncate_output(&rows_json),
            serde_json::json!({
                "columns": output.columns,
                "row_count": output.rows.len(),
                "truncated": output.truncated
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

    fn seeded_db(dir: &Path) -> PathBuf {
        let path = dir.join("lessons.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE vocabulary (id INTEGER PRIMARY KEY, word TEXT, lesson INTEGER);
             INSERT INTO vocabulary (word, lesson) VALUES ('hola', 1), ('adiós', 1), ('gracias', 2);",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_select_with_params() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("t", dir.path()).with_database(seeded_db(dir.path()));

        let result = QueryDatabaseTool::new()
            .execute(
                &ctx,
                json!({"sql": "SELECT word FROM vocabulary WHERE lesson = ? ORDER BY id", "params": [1]}),
            )
            .await;
        assert!(result.success, "{:?}", result.error);
        let rows: Vec<Value> = serde_json::from_str(&result.content).unwrap();
        assert_eq!(rows, vec![json!({"word": "hola"}), json!({"word": "adiós"})]);
    }

    #[tokio::test]
    async fn test_write_statement_rejected() {
        let dir = tempdir().unwrap();
        let db = seeded_db(dir.path());
        let ctx = ToolContext::new("t", dir.path()).with_database(&db);

        let result = QueryDatabaseTool::new()
            .execute(&ctx, json!({"sql": "DELETE FROM vocabulary"}))
            .await;
        assert!(!result.success);

        let conn = Connection::open(&db).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vocabulary", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("t", dir.path()).with_database(seeded_db(dir.path()));

        let result = QueryDatabaseTool::new()
            .execute(&ctx, json!({"sql": "SELECT * FROM vocabulary", "limit": 2}))
            .await;
        let meta = result.metadata.unwrap();
        assert_eq!(meta["row_count"], 2);
        assert_eq!(meta["truncated"], true);
    }

    #[tokio::test]
    async fn test_no_database_configured() {
        let ctx = ToolContext::new("t", ".");
        let result = QueryDatabaseTool::new()
            .execute(&ctx, json!({"sql": "SELECT 1"}))
            .await;
        assert!(!result.success);
    }
}
