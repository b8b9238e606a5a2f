//! Response parser
//!
//! 모델 응답 하나를 `Finish`, `Action`, `Thought` 중 정확히 하나로 해석합니다.
//!
//! ## 우선순위
//! 1. 줄 시작의 `Finish:` (대소문자 무시) - 앞에 Thought/Action이 있어도 Finish
//! 2. `Action:` 뒤의 JSON 객체들 - 하나라도 살아남으면 Action
//! 3. 줄 시작의 `Thought:` - Thought
//! 4. 그 외에는 원문 전체를 Thought로
//!
//! 잘못된 Action 하나는 해당 Action만 버리고 나머지 파싱을 계속합니다.

use crate::scanner::JsonSpanScanner;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static FINISH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*finish[ \t]*:").expect("finish marker regex"));

static THOUGHT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*thought[ \t]*:").expect("thought marker regex"));

static ACTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\baction[ \t]*:").expect("action marker regex"));

/// Thought 내용이 끝나는 지점
static THOUGHT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:action|finish)[ \t]*:").expect("thought end regex")
});

/// Finish 내용이 끝나는 지점
static FINISH_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:thought|action|observation)[ \t]*:").expect("finish end regex")
});

static LEGACY_TOOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("tool name regex"));

const TOOL_NAME_KEYS: &[&str] = &["tool_name", "tool", "name"];
/// `name {json}` 형태에서는 `name`이 파라미터일 수 있음
const EXPLICIT_TOOL_NAME_KEYS: &[&str] = &["tool_name", "tool"];
const PARAMS_KEYS: &[&str] = &["params", "parameters", "args"];

// ============================================================================
// Types
// ============================================================================

/// One tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub tool_name: String,
    /// Always a JSON object
    pub params: Value,
}

impl ActionCall {
    pub fn new(tool_name: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
        Self {
            tool_name: tool_name.into(),
            params,
        }
    }
}

/// Parsed model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// 행동 없는 생각
    Thought(String),
    /// 생각 + 순서대로 실행할 도구 호출들
    Action {
        thought: String,
        actions: Vec<ActionCall>,
    },
    /// 완료 선언
    Finish(String),
}

impl ParsedResponse {
    pub fn is_finish(&self) -> bool {
        matches!(self, ParsedResponse::Finish(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParsedResponse::Thought(_) => "thought",
            ParsedResponse::Action { .. } => "action",
            ParsedResponse::Finish(_) => "finish",
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one raw model response
pub fn parse_response(text: &str) -> ParsedResponse {
    if let Some(finish) = extract_finish(text) {
        return ParsedResponse::Finish(finish);
    }

    let thought = extract_thought(text);
    let actions = extract_actions(text);

    if !actions.is_empty() {
        let thought = thought.unwrap_or_else(|| {
            let first = ACTION_MARKER.find(text).map(|m| m.start()).unwrap_or(0);
            text[..first].trim().to_string()
        });
        return ParsedResponse::Action { thought, actions };
    }

    match thought {
        Some(thought) => ParsedResponse::Thought(thought),
        None => ParsedResponse::Thought(text.to_string()),
    }
}

fn extract_finish(text: &str) -> Option<String> {
    let marker = FINISH_MARKER.find(text)?;
    let rest = &text[marker.end()..];
    let end = FINISH_END.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

fn extract_thought(text: &str) -> Option<String> {
    let marker = THOUGHT_MARKER.find(text)?;
    let rest = &text[marker.end()..];

    let end = THOUGHT_END.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// 모든 `Action:` 마커에서 도구 호출 추출 (발견 순서)
pub fn extract_actions(text: &str) -> Vec<ActionCall> {
    let mut actions = Vec::new();
    let mut cursor = 0;

    while let Some(marker) = ACTION_MARKER.find_at(text, cursor) {
        let after_marker = marker.end();

        let Some(span) = JsonSpanScanner::find_span(text, after_marker) else {
            debug!(offset = marker.start(), "Action marker without a complete JSON object");
            cursor = after_marker;
            continue;
        };

        // 다음 Action 마커가 JSON보다 먼저 나오면 이 마커는 버림
        if let Some(next) = ACTION_MARKER.find_at(text, after_marker) {
            if next.start() < span.start {
                debug!(offset = marker.start(), "Action marker without JSON before the next marker");
                cursor = after_marker;
                continue;
            }
        }

        let prefix = text[after_marker..span.start].trim();
        let payload = &text[span.clone()];

        match decode_action(prefix, payload) {
            Some(action) => actions.push(action),
            None => warn!(
                payload = %truncate_for_log(payload),
                "Dropping malformed action"
            ),
        }
        cursor = span.end;
    }

    actions
}

/// `prefix`는 마커와 `{` 사이의 텍스트 (코드 펜스, 설명, 레거시 도구 이름)
fn decode_action(prefix: &str, payload: &str) -> Option<ActionCall> {
    let parsed = parse_json_lenient(payload)?;
    let legacy = LEGACY_TOOL_NAME.is_match(prefix);

    let name_keys = if legacy { EXPLICIT_TOOL_NAME_KEYS } else { TOOL_NAME_KEYS };
    if let Some(action) = action_from_object(&parsed, name_keys) {
        return Some(action);
    }

    // legacy: `name {json}`
    match parsed {
        Value::Object(params) if legacy => Some(ActionCall::new(prefix, Value::Object(params))),
        _ => None,
    }
}

fn action_from_object(value: &Value, name_keys: &[&str]) -> Option<ActionCall> {
    let obj = value.as_object()?;

    let tool_name = name_keys
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let params = PARAMS_KEYS
        .iter()
        .find_map(|key| obj.get(*key))
        .cloned()
        .unwrap_or(Value::Null);

    Some(ActionCall::new(tool_name, params))
}

/// JSON 파싱, 실패하면 백슬래시 복구 후 재시도
pub fn parse_json_lenient(payload: &str) -> Option<Value> {
    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(first) => {
            let repaired = repair_backslashes(payload);
            match serde_json::from_str(&repaired) {
                Ok(value) => {
                    debug!(error = %first, "Parsed action JSON after backslash repair");
                    Some(value)
                }
                Err(_) => None,
            }
        }
    }
}

/// 유효하지 않은 이스케이프(`\` 뒤가 `n t r f b u " \ /`가 아님)를 `\\`로
pub fn repair_backslashes(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 8);
    let mut chars = payload.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next) if matches!(next, 'n' | 't' | 'r' | 'f' | 'b' | 'u' | '"' | '\\' | '/') => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            _ => out.push_str("\\\\"),
        }
    }
    out
}

fn truncate_for_log(s: &str) -> String {
    const MAX: usize = 200;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
