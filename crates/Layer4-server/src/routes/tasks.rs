//! Task endpoints
//!
//! 이벤트 스트림은 저장된 이벤트를 먼저 재생하고, 이후 버스의 실시간 이벤트를
//! 종료 이벤트가 나올 때까지 전달합니다. 구독을 레코드 조회보다 먼저 열어 두고
//! 이미 보낸 이벤트 ID는 건너뛰므로 그 사이의 이벤트가 빠지거나 두 번 가지 않습니다.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use lingo_foundation::{AgentOverrides, EventId, StatusEvent};
use lingo_task::{TaskId, TaskRecord, TaskSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppError;
use crate::AppState;

/// Channel buffer size for SSE events
const SSE_CHANNEL_BUFFER: usize = 64;

/// Request body for creating a task
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub prompt: String,
    #[serde(default)]
    pub config: Option<AgentOverrides>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: TaskId,
    pub status: &'static str,
}

/// Build the tasks router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).delete(delete_task))
        .route("/:id/cancel", post(cancel_task))
        .route("/:id/retry", post(retry_task))
        .route("/:id/events", get(stream_events))
}

fn parse_id(raw: &str) -> Result<TaskId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid task id: {}", raw)))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskSummary>>, AppError> {
    Ok(Json(state.runner.list().await?))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskRecord>), AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".into()));
    }
    let overrides = req.config.unwrap_or_default();
    let record = state.runner.submit(req.prompt, &overrides).await?;
    tracing::info!(task_id = %record.id, "Task submitted");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.runner.get(&id).await?))
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), AppError> {
    let id = parse_id(&id)?;
    state.runner.cancel(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            id,
            status: "cancelling",
        }),
    ))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.runner.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn retry_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TaskRecord>), AppError> {
    let id = parse_id(&id)?;
    let original = state.runner.get(&id).await?;
    if !original.is_terminal() || state.runner.is_running(&id) {
        return Err(AppError::Conflict(format!("Task {} is still running", id)));
    }
    let record = state.runner.retry(&id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let id = parse_id(&id)?;
    let mut live = state.runner.bus().receiver();
    let record = state.runner.get(&id).await?;

    let (sse_tx, sse_rx) = mpsc::channel::<Result<Event, Infallible>>(SSE_CHANNEL_BUFFER);
    tokio::spawn(async move {
        let mut seen: HashSet<EventId> = HashSet::new();
        for event in &record.events {
            seen.insert(event.id.clone());
            if !send_event(&sse_tx, event).await {
                return;
            }
        }
        if record.is_terminal() {
            return;
        }

        let task_key = id.to_string();
        loop {
            match live.recv().await {
                Ok(event) => {
                    if event.task_id != task_key || seen.contains(&event.id) {
                        continue;
                    }
                    let terminal = event.is_terminal();
                    if !send_event(&sse_tx, &event).await || terminal {
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(task_id = %id, skipped, "SSE subscriber lagged behind");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });

    let stream = ReceiverStream::new(sse_rx);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn send_event(sse_tx: &mpsc::Sender<Result<Event, Infallible>>, event: &StatusEvent) -> bool {
    let sse_event = Event::default()
        .event(event.event_type.as_str())
        .id(event.id.to_string())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("error"));
    sse_tx.send(Ok(sse_event)).await.is_ok()
}
