//! # lingo-server
//!
//! HTTP/SSE API for Lingo tasks.
//!
//! - `runner.rs` - 태스크마다 에이전트 하나를 실행하고 이벤트를 기록/발행
//! - `routes/` - `/api/tasks` CRUD, 취소, 재시도, SSE 이벤트 스트림
//! - `error.rs` - `{error, code}` JSON 에러 응답
//!
//! 라이브러리 crate이며 서버는 `start_server()`로 시작합니다.

use std::net::SocketAddr;

use axum::{http::Method, routing::get, Json, Router};
use lingo_foundation::LingoConfig;
use lingo_task::TaskStore;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes;
pub mod runner;

pub use error::{ApiError, AppError};
pub use runner::{fixed_provider, provider_factory, ProviderFactory, TaskRunner};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runner: TaskRunner,
}

impl AppState {
    pub fn new(runner: TaskRunner) -> Self {
        Self { runner }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Lingo server and block until Ctrl-C.
pub async fn start_server(config: LingoConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let store = TaskStore::new(config.server.tasks_dir());
    let providers = provider_factory(config.provider.clone());
    let runner = TaskRunner::new(&config, store, providers)?;

    tracing::info!(
        tasks_dir = %runner.store().dir().display(),
        model = %config.agent.model,
        "Lingo server listening on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(AppState::new(runner)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
