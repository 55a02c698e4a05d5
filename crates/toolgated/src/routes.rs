//! API routes for toolgated

use crate::middleware::require_shared_secret;
use crate::server::AppState;
use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use hybridops_common::protocol::{ToolRunRequest, ToolRunResponse, ToolsListResponse};
use hybridops_common::tools;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Tool Routes (shared secret required)
// ============================================================================

pub fn tool_routes(state: AppStateArc) -> Router<AppStateArc> {
    Router::new()
        .route("/run", post(run_tool))
        .route("/tools", get(list_tools))
        .route_layer(middleware::from_fn_with_state(state, require_shared_secret))
}

async fn run_tool(
    State(state): State<AppStateArc>,
    Json(req): Json<ToolRunRequest>,
) -> Json<ToolRunResponse> {
    info!("Run {} (confirm={})", req.tool, req.confirm);
    Json(state.gate.run(req).await)
}

async fn list_tools() -> Json<ToolsListResponse> {
    Json(ToolsListResponse {
        tools: tools::catalog(),
    })
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "toolgate",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}
