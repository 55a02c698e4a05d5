//! Shared-secret guard for the tool endpoints

use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hybridops_common::protocol::SHARED_SECRET_HEADER;
use hybridops_common::secret::secrets_match;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// 500 while no secret is configured, 401 on an absent or wrong header
pub async fn require_shared_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.shared_secret.is_empty() {
        error!("Shared secret not configured; refusing {}", request.uri().path());
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "MCP_SHARED_SECRET not configured" })),
        )
            .into_response();
    }

    let presented = request
        .headers()
        .get(SHARED_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !secrets_match(presented, &state.shared_secret) {
        warn!("Invalid shared secret on {}", request.uri().path());
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid MCP secret" })),
        )
            .into_response();
    }

    next.run(request).await
}
