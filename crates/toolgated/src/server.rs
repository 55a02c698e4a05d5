//! HTTP server for toolgated

use crate::backend::ApiBackend;
use crate::executor::ToolExecutor;
use crate::gate::ToolGate;
use crate::routes;
use anyhow::Result;
use axum::Router;
use hybridops_common::config::ToolGateConfig;
use hybridops_common::ledger::TokenLedger;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Maximum body size: 64 KiB
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub gate: ToolGate,
    pub shared_secret: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &ToolGateConfig, backend: Arc<dyn ApiBackend>) -> Self {
        let ledger = TokenLedger::with_ttl(config.confirm_ttl());
        Self {
            gate: ToolGate::new(ToolExecutor::new(backend), ledger),
            shared_secret: config.shared_secret.clone(),
            start_time: Instant::now(),
        }
    }
}

/// Router with every toolgated endpoint
pub fn app(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(routes::tool_routes(state.clone()))
        .merge(routes::health_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(config: ToolGateConfig, backend: Arc<dyn ApiBackend>) -> Result<()> {
    if config.shared_secret.is_empty() {
        warn!("MCP_SHARED_SECRET is empty; /run and /tools will answer 500");
    }

    let app = app(AppState::new(&config, backend));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("  Listening on http://{}", config.bind);
    info!("  Supervisor API: {}", config.api_base_url);

    axum::serve(listener, app).await?;
    Ok(())
}
