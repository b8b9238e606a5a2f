//! API routes

use axum::Router;

use crate::AppState;

mod tasks;

/// Build the API router with all endpoints
pub fn api_router() -> Router<AppState> {
    Router::new().nest("/tasks", tasks::router())
}
