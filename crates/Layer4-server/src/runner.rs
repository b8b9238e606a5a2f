//! Task Runner - 태스크마다 에이전트 하나를 tokio 태스크로 실행
//!
//! ```text
//! submit() ──▶ TaskStore.create ──▶ tokio::spawn(Agent::run)
//!                                         │ emit()
//!                                         ▼
//!                                   TaskRecorder ──▶ TaskStore.append_event (blocking pool)
//!                                         │
//!                                         └──────▶ EventBus.publish ──▶ SSE
//! ```
//!
//! 실행 중인 태스크의 취소 핸들은 `running` 맵에 있고, 실행이 끝나면 빠집니다.

use async_trait::async_trait;
use lingo_agent::{Agent, CancelHandle, PromptTemplates};
use lingo_foundation::{
    AgentOverrides, AgentSettings, Error, EventBus, LingoConfig, PricingTable, ProviderSettings,
    Result, StatusEvent, StatusEventType, StatusSink, ToolSettings,
};
use lingo_provider::{create_provider, Provider};
use lingo_task::{TaskId, TaskRecord, TaskStore, TaskSummary};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 태스크 설정으로 LLM 제공자를 만드는 함수
pub type ProviderFactory =
    Arc<dyn Fn(&AgentSettings) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// 설정 파일의 provider 섹션으로 제공자 생성
pub fn provider_factory(settings: ProviderSettings) -> ProviderFactory {
    Arc::new(move |agent: &AgentSettings| -> Result<Arc<dyn Provider>> {
        Ok(create_provider(&settings, &agent.model)?)
    })
}

/// 모든 태스크가 같은 제공자를 쓰도록 고정
pub fn fixed_provider(provider: Arc<dyn Provider>) -> ProviderFactory {
    Arc::new(move |_: &AgentSettings| -> Result<Arc<dyn Provider>> { Ok(provider.clone()) })
}

// ============================================================================
// TaskRecorder
// ============================================================================

/// 이벤트를 태스크 레코드에 기록한 뒤 버스로 발행하는 sink
struct TaskRecorder {
    id: TaskId,
    store: TaskStore,
    bus: Arc<EventBus>,
}

#[async_trait]
impl StatusSink for TaskRecorder {
    async fn emit(&self, event: StatusEvent) {
        let store = self.store.clone();
        let id = self.id;
        let stored = event.clone();
        match tokio::task::spawn_blocking(move || store.append_event(&id, &stored)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!(task_id = %self.id, event_type = %event.event_type, error = %e, "Failed to record event")
            }
            Err(e) => error!(task_id = %self.id, error = %e, "Recorder task failed"),
        }
        self.bus.publish(event);
    }
}

// ============================================================================
// TaskRunner
// ============================================================================

struct RunnerInner {
    store: TaskStore,
    bus: Arc<EventBus>,
    providers: ProviderFactory,
    defaults: AgentSettings,
    tool_settings: ToolSettings,
    pricing: PricingTable,
    templates: PromptTemplates,
    running: Mutex<HashMap<TaskId, CancelHandle>>,
}

/// Runs submitted tasks in the background
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<RunnerInner>,
}

impl TaskRunner {
    /// 설정에서 기본 에이전트 설정, 도구 설정, 가격표, 템플릿을 가져옵니다
    pub fn new(config: &LingoConfig, store: TaskStore, providers: ProviderFactory) -> Result<Self> {
        let templates = PromptTemplates::load(config.templates_dir.as_deref())?;
        let pricing = PricingTable::default().with_overrides(&config.pricing);

        Ok(Self {
            inner: Arc::new(RunnerInner {
                store,
                bus: Arc::new(EventBus::new()),
                providers,
                defaults: config.agent.clone(),
                tool_settings: config.tools.clone(),
                pricing,
                templates,
                running: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn is_running(&self, id: &TaskId) -> bool {
        self.inner.running.lock().contains_key(id)
    }

    pub fn running_count(&self) -> usize {
        self.inner.running.lock().len()
    }

    /// 저장소 호출을 블로킹 풀에서 실행
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TaskStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.inner.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| Error::Internal(format!("store task failed: {}", e)))?
    }

    pub async fn get(&self, id: &TaskId) -> Result<TaskRecord> {
        let id = *id;
        self.blocking(move |store| store.require(&id)).await
    }

    pub async fn list(&self) -> Result<Vec<TaskSummary>> {
        self.blocking(|store| store.list()).await
    }

    /// 새 태스크 생성 후 실행 시작
    pub async fn submit(
        &self,
        prompt: impl Into<String>,
        overrides: &AgentOverrides,
    ) -> Result<TaskRecord> {
        let settings = overrides.apply(&self.inner.defaults);
        self.launch(prompt.into(), settings).await
    }

    /// 끝난 태스크를 같은 프롬프트와 설정으로 다시 실행
    pub async fn retry(&self, id: &TaskId) -> Result<TaskRecord> {
        let original = self.get(id).await?;
        if !original.is_terminal() || self.is_running(id) {
            return Err(Error::Task(format!("task {} is still running", id)));
        }
        info!(task_id = %id, "Retrying task");
        self.launch(original.prompt, original.config).await
    }

    async fn launch(&self, prompt: String, settings: AgentSettings) -> Result<TaskRecord> {
        let record = self
            .blocking(move |store| store.create(prompt, settings))
            .await?;
        self.start(&record);
        Ok(record)
    }

    fn start(&self, record: &TaskRecord) {
        let cancel = CancelHandle::new();
        self.inner.running.lock().insert(record.id, cancel.clone());

        let inner = self.inner.clone();
        let id = record.id;
        let prompt = record.prompt.clone();
        let settings = record.config.clone();
        tokio::spawn(async move {
            inner.execute(id, &prompt, settings, &cancel).await;
            inner.running.lock().remove(&id);
        });
    }

    /// 협조적 취소 요청
    ///
    /// 실행 중이 아니고 레코드도 이미 끝났으면 `TaskFinished`. 레코드는 running인데
    /// 이 프로세스에 실행이 없으면 (재시작 등) 바로 cancelled로 기록합니다.
    pub async fn cancel(&self, id: &TaskId) -> Result<()> {
        if let Some(handle) = self.inner.running.lock().get(id) {
            info!(task_id = %id, "Cancellation requested");
            handle.cancel();
            return Ok(());
        }

        let record = self.get(id).await?;
        if record.is_terminal() {
            return Err(Error::TaskFinished(format!(
                "task {} is already {}",
                id, record.status
            )));
        }

        warn!(task_id = %id, "Cancelling orphaned task");
        let event = StatusEvent::new(id.to_string(), StatusEventType::Cancelled).with_data(json!({
            "iterations": record.iterations,
            "total_cost": record.cost_usd,
            "total_input_tokens": record.input_tokens,
            "total_output_tokens": record.output_tokens,
            "reason": "orphaned",
        }));
        self.inner.recorder(*id).emit(event).await;
        Ok(())
    }

    /// 실행 중이면 취소하고 레코드 파일 삭제
    pub async fn delete(&self, id: &TaskId) -> Result<()> {
        if let Some(handle) = self.inner.running.lock().remove(id) {
            handle.cancel();
        }
        let key = *id;
        if !self.blocking(move |store| store.delete(&key)).await? {
            return Err(Error::NotFound(format!("task {}", id)));
        }
        info!(task_id = %id, "Task deleted");
        Ok(())
    }
}

impl RunnerInner {
    fn recorder(&self, id: TaskId) -> TaskRecorder {
        TaskRecorder {
            id,
            store: self.store.clone(),
            bus: self.bus.clone(),
        }
    }

    async fn execute(&self, id: TaskId, prompt: &str, settings: AgentSettings, cancel: &CancelHandle) {
        let recorder = self.recorder(id);
        let task_id = id.to_string();

        let provider = match (self.providers)(&settings) {
            Ok(provider) => provider,
            Err(e) => {
                error!(task_id = %id, error = %e, "Failed to create provider");
                let event = StatusEvent::new(&task_id, StatusEventType::Error).with_data(json!({
                    "error": e.to_string(),
                    "iterations": 0,
                    "total_cost": 0.0,
                }));
                recorder.emit(event).await;
                return;
            }
        };

        let agent = Agent::new(provider, settings)
            .with_tool_settings(self.tool_settings.clone())
            .with_pricing(self.pricing.clone())
            .with_templates(self.templates.clone());

        info!(task_id = %id, model = %agent.settings().model, "Task started");
        let outcome = agent.run(&task_id, prompt, &recorder, cancel).await;
        info!(
            task_id = %id,
            status = ?outcome.status,
            iterations = outcome.iterations,
            cost = outcome.total_cost,
            "Task finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_provider::ScriptedProvider;
    use lingo_task::TaskStatus;
    use std::time::Duration;
    use tempfile::tempdir;

    fn runner(dir: &std::path::Path, provider: ScriptedProvider) -> TaskRunner {
        let mut config = LingoConfig::default();
        config.tools.workspace_root = Some(dir.to_path_buf());
        let providers = fixed_provider(Arc::new(provider));
        TaskRunner::new(&config, TaskStore::new(dir.join("tasks")), providers).unwrap()
    }

    async fn wait_finished(runner: &TaskRunner, id: &TaskId) -> TaskRecord {
        for _ in 0..200 {
            let record = runner.get(id).await.unwrap();
            if record.is_terminal() && !runner.is_running(id) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish", id);
    }

    #[tokio::test]
    async fn test_submit_runs_to_completion() {
        let dir = tempdir().unwrap();
        let provider = ScriptedProvider::new(["Finish: ok", "Finish: ok", "Finish: ok"]);
        let runner = runner(dir.path(), provider);

        let record = runner
            .submit("Review lesson 2", &AgentOverrides::default())
            .await
            .unwrap();
        assert_eq!(record.status, TaskStatus::Running);

        let done = wait_finished(&runner, &record.id).await;
        assert_eq!(done.status, TaskStatus::Complete);
        assert_eq!(done.iterations, 3);
        assert_eq!(done.events[0].event_type, StatusEventType::Start);
        assert!(done.events.last().unwrap().is_terminal());
        assert_eq!(runner.running_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_factory_failure_marks_task_failed() {
        let dir = tempdir().unwrap();
        let mut config = LingoConfig::default();
        config.tools.workspace_root = Some(dir.path().to_path_buf());
        let providers: ProviderFactory =
            Arc::new(|_: &AgentSettings| -> Result<Arc<dyn Provider>> {
                Err(Error::Config("GEMINI_API_KEY is not set".into()))
            });
        let runner =
            TaskRunner::new(&config, TaskStore::new(dir.path().join("tasks")), providers).unwrap();

        let record = runner
            .submit("Anything", &AgentOverrides::default())
            .await
            .unwrap();
        let done = wait_finished(&runner, &record.id).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done
            .result
            .unwrap()
            .error
            .unwrap()
            .contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let dir = tempdir().unwrap();
        let provider = ScriptedProvider::new(["Thought: thinking", "Thought: thinking"])
            .with_delay(Duration::from_millis(200));
        let runner = runner(dir.path(), provider);

        let record = runner
            .submit("Slow task", &AgentOverrides::default())
            .await
            .unwrap();
        runner.cancel(&record.id).await.unwrap();

        let done = wait_finished(&runner, &record.id).await;
        assert_eq!(done.status, TaskStatus::Cancelled);

        let err = runner.cancel(&record.id).await.unwrap_err();
        assert!(matches!(err, Error::TaskFinished(_)));
    }

    #[tokio::test]
    async fn test_cancel_orphaned_record() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), ScriptedProvider::new(Vec::<String>::new()));
        let orphan = runner
            .store()
            .create("Left over", AgentSettings::default())
            .unwrap();

        runner.cancel(&orphan.id).await.unwrap();
        let record = runner.get(&orphan.id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_retry_requires_finished_task() {
        let dir = tempdir().unwrap();
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let runner = runner(dir.path(), provider);
        let orphan = runner
            .store()
            .create("Still running", AgentSettings::default())
            .unwrap();
        assert!(runner.retry(&orphan.id).await.is_err());

        let record = runner
            .submit("Fails fast", &AgentOverrides::default())
            .await
            .unwrap();
        let failed = wait_finished(&runner, &record.id).await;
        assert_eq!(failed.status, TaskStatus::Failed);

        let retried = runner.retry(&record.id).await.unwrap();
        assert_ne!(retried.id, record.id);
        assert_eq!(retried.prompt, "Fails fast");
        wait_finished(&runner, &retried.id).await;
    }

    #[tokio::test]
    async fn test_delete_unknown_task() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), ScriptedProvider::new(Vec::<String>::new()));
        let err = runner.delete(&TaskId::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
