//! Lingo Config - 통합 설정
//!
//! 로드 순서 (뒤에 오는 것이 우선):
//! 1. 글로벌 `~/.config/lingo/config.json`
//! 2. 프로젝트 `.lingo/config.json`
//! 3. `--config` 로 지정한 TOML 파일
//! 4. 환경 변수 (`GEMINI_API_KEY`, `OPENAI_API_KEY`, `LINGO_PROVIDER`, `LINGO_MODEL`)
//!
//! 파일 단위 병합은 JSON 값 수준에서 키별로 수행하므로 부분 설정 파일도 허용됩니다.

use super::agent::AgentSettings;
use crate::pricing::ModelPricing;
use crate::storage::{JsonStore, PROJECT_DIR_NAME};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 설정 파일명
pub const LINGO_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Provider
// ============================================================================

/// LLM 제공자 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Openai,
}

impl ProviderKind {
    /// API 키 환경 변수
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::Openai),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// 제공자 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,

    /// API 키 (없으면 환경 변수)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// 사용자 지정 엔드포인트
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// HTTP 타임아웃 (초)
    pub timeout_secs: u64,

    /// 일시적 오류 재시도 횟수
    pub max_retries: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            base_url: None,
            timeout_secs: 300,
            max_retries: 3,
        }
    }
}

// ============================================================================
// Server / Tools
// ============================================================================

/// HTTP 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// 태스크 레코드 디렉토리 (기본: `.lingo/tasks`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tasks_dir: None,
        }
    }
}

impl ServerSettings {
    pub fn tasks_dir(&self) -> PathBuf {
        self.tasks_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROJECT_DIR_NAME).join("tasks"))
    }
}

/// 도구 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// 파일 도구가 접근할 수 있는 루트 (기본: 현재 디렉토리)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// 레슨/어휘 SQLite 파일
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// 명령 실행 타임아웃 (초)
    pub command_timeout_secs: u64,

    /// 도구 출력 최대 문자 수
    pub max_output_chars: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            workspace_root: None,
            database_path: None,
            command_timeout_secs: 60,
            max_output_chars: 20_000,
        }
    }
}

impl ToolSettings {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

// ============================================================================
// LingoConfig (통합)
// ============================================================================

/// Lingo 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LingoConfig {
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
    pub server: ServerSettings,
    pub tools: ToolSettings,

    /// 가격표 추가/덮어쓰기
    pub pricing: HashMap<String, ModelPricing>,

    /// 프롬프트 템플릿 디렉토리
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl LingoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 (+ TOML) 병합 로드 후 환경 변수 적용
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut merged = Value::Object(Default::default());

        if let Ok(global) = JsonStore::global() {
            if let Some(value) = global.load_optional::<Value>(LINGO_CONFIG_FILE)? {
                debug!(path = %global.file_path(LINGO_CONFIG_FILE).display(), "Loaded global config");
                merge_values(&mut merged, value);
            }
        }

        if let Ok(project) = JsonStore::current_project() {
            if let Some(value) = project.load_optional::<Value>(LINGO_CONFIG_FILE)? {
                debug!(path = %project.file_path(LINGO_CONFIG_FILE).display(), "Loaded project config");
                merge_values(&mut merged, value);
            }
        }

        if let Some(path) = explicit {
            merge_values(&mut merged, Self::read_toml(path)?);
        }

        let mut config: LingoConfig = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.agent.validate()?;
        Ok(config)
    }

    /// TOML 파일 하나를 JSON 값으로 읽기
    fn read_toml(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let parsed: toml::Value = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        serde_json::to_value(parsed).map_err(Error::from)
    }

    /// TOML 문자열에서 로드 (파일 병합 없음)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))
    }

    /// 환경 변수 적용
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("LINGO_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }
        if let Some(model) = lookup("LINGO_MODEL") {
            self.agent.model = model;
        }
        if self.provider.api_key.is_none() {
            self.provider.api_key = lookup(self.provider.kind.api_key_env());
        }
        Ok(())
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(LINGO_CONFIG_FILE, self)
    }
}

/// JSON 객체 재귀 병합 (overlay 우선)
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
