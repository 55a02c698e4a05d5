//! HTTP server for hybridopsd

use crate::auth::{OperatorAuth, SessionAuth};
use crate::idempotency::{IdempotencyStore, EVENT_DEDUPE_TTL};
use crate::jobs::JobStore;
use crate::middleware::{body_size_limit, RateLimiter, MAX_BODY_SIZE};
use crate::routes;
use crate::slack::SlackIntake;
use crate::supervisor::{Orchestrator, ToolGateClient};
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use hybridops_common::config::SupervisorConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub gate: Arc<dyn ToolGateClient>,
    pub session: Arc<SessionAuth>,
    pub operator_auth: Arc<dyn OperatorAuth>,
    pub login_limiter: RateLimiter,
    pub jobs: JobStore,
    pub slack: SlackIntake,
    pub enable_test_endpoints: bool,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &SupervisorConfig, gate: Arc<dyn ToolGateClient>) -> Self {
        let session = Arc::new(SessionAuth::new(&config.auth));
        let jobs = JobStore::new();
        let processed = IdempotencyStore::new(config.slack.max_processed_events, EVENT_DEDUPE_TTL);

        Self {
            orchestrator: Orchestrator::new(gate.clone(), config.supervisor.require_2step_for_read),
            gate,
            operator_auth: session.clone(),
            session,
            login_limiter: RateLimiter::new(
                config.auth.login_attempts,
                Duration::from_secs(config.auth.login_window_secs),
            ),
            slack: SlackIntake::new(&config.slack.signing_secret, processed, jobs.clone()),
            jobs,
            enable_test_endpoints: config.jobs.enable_test_endpoints,
            start_time: Instant::now(),
        }
    }
}

/// Router with every hybridopsd endpoint
pub fn app(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::auth_routes())
        .merge(routes::slack_routes())
        .merge(routes::job_routes(state.clone()))
        .merge(routes::supervisor_routes(state.clone()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware::from_fn(body_size_limit))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(config: SupervisorConfig, gate: Arc<dyn ToolGateClient>) -> Result<()> {
    let bind = config.bind.clone();
    let state = AppState::new(&config, gate);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("  Listening on http://{}", bind);
    info!("  Tool gate: {}", config.toolgate.base_url);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
