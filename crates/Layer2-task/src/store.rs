//! Task store - 태스크 하나당 JSON 파일 하나
//!
//! 갱신은 읽기 → 수정 → 쓰기이며 격리는 없습니다. 태스크 하나의 쓰기는
//! 그 태스크를 실행하는 에이전트만 하므로 마지막 쓰기가 이기는 것으로 충분합니다.

use crate::task::{TaskId, TaskRecord, TaskSummary};
use lingo_foundation::{AgentSettings, Error, JsonStore, Result, StatusEvent};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk task store
#[derive(Debug, Clone)]
pub struct TaskStore {
    files: JsonStore,
}

impl TaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: JsonStore::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.files.base_dir()
    }

    fn file_name(id: &TaskId) -> String {
        format!("{}.json", id)
    }

    /// 새 태스크 생성 및 저장
    pub fn create(&self, prompt: impl Into<String>, config: AgentSettings) -> Result<TaskRecord> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::Validation("prompt must not be empty".into()));
        }
        config.validate()?;

        let record = TaskRecord::new(prompt, config);
        self.files.save(&Self::file_name(&record.id), &record)?;
        debug!(task_id = %record.id, "Task created");
        Ok(record)
    }

    pub fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>> {
        self.files.load_optional(&Self::file_name(id))
    }

    /// 없으면 `NotFound`
    pub fn require(&self, id: &TaskId) -> Result<TaskRecord> {
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("task {}", id)))
    }

    /// 모든 태스크 요약 (최신순)
    pub fn list(&self) -> Result<Vec<TaskSummary>> {
        let mut summaries = Vec::new();
        for name in self.files.list_names()? {
            match self.files.load::<TaskRecord>(&format!("{}.json", name)) {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => warn!(file = %name, error = %e, "Skipping unreadable task file"),
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// 읽기-수정-쓰기. 종료된 태스크는 `TaskFinished`
    pub fn update<F>(&self, id: &TaskId, f: F) -> Result<TaskRecord>
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut record = self.require(id)?;
        if record.is_terminal() {
            return Err(Error::TaskFinished(format!(
                "task {} is already {}",
                id, record.status
            )));
        }
        f(&mut record);
        self.files.save(&Self::file_name(id), &record)?;
        Ok(record)
    }

    /// 이벤트 추가
    pub fn append_event(&self, id: &TaskId, event: &StatusEvent) -> Result<TaskRecord> {
        self.update(id, |record| record.apply_event(event))
    }

    /// 삭제. 파일이 있었으면 true
    pub fn delete(&self, id: &TaskId) -> Result<bool> {
        let name = Self::file_name(id);
        let existed = self.files.exists(&name);
        self.files.remove(&name)?;
        Ok(existed)
    }
}
