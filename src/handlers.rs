use crate::agents::{AgentRuntime, RuntimeStatus};
use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Engines and their scheduler.
    pub runtime: Arc<AgentRuntime>,
}

/// Health check endpoint.
///
/// Returns 200 while the scheduler is running and 503 once it has been
/// stopped, so a platform health check stops routing during shutdown.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let stopped = state.runtime.status().stopped;
    let status = if stopped {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(json!({
            "status": if stopped { "stopping" } else { "healthy" },
            "service": "freight-agents",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /status
///
/// Scheduler task statuses plus registry sizes.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<RuntimeStatus> {
    Json(state.runtime.status())
}
