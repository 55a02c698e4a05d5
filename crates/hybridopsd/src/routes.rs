//! API routes for hybridopsd

use crate::auth::AuthError;
use crate::jobs::{Job, JobCreate, JobError, JobQuery, JobStatus, JobStatusUpdate, JobUpdate};
use crate::middleware::require_operator;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use hybridops_common::protocol::{
    ExecuteRequest, ExecuteResponse, LoginRequest, LoginResponse, PlanRequest, PlanResponse,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

type AppStateArc = Arc<AppState>;

/// Error body is `{"detail": "..."}` so downstream callers can surface it
type ApiError = (StatusCode, Json<Value>);

fn detail(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": message.into() })))
}

impl From<JobError> for (StatusCode, Json<Value>) {
    fn from(e: JobError) -> Self {
        let status = match e {
            JobError::NotFound => StatusCode::NOT_FOUND,
            JobError::NotAwaitingApproval { .. } => StatusCode::BAD_REQUEST,
        };
        detail(status, e.to_string())
    }
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn version(State(state): State<AppStateArc>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "HybridOps Supervisor API",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

// ============================================================================
// Auth Routes
// ============================================================================

pub fn auth_routes() -> Router<AppStateArc> {
    Router::new().route("/auth/login", post(login))
}

async fn login(
    State(state): State<AppStateArc>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    if !state.session.is_configured() {
        error!("Login attempted but admin is not configured");
        return Err(AuthError::NotConfigured);
    }

    let key = req.email.trim().to_lowercase();
    state.login_limiter.cleanup().await;
    if !state.login_limiter.check(&key).await {
        return Err(AuthError::RateLimited);
    }

    match state
        .session
        .login(&req.email, &req.password, chrono::Utc::now().timestamp())
    {
        Ok(resp) => {
            info!("Operator {} logged in", resp.user.email);
            Ok(Json(resp))
        }
        Err(e) => {
            warn!("Login failed for {}: {}", key, e);
            Err(e)
        }
    }
}

// ============================================================================
// Job Routes (operator required)
// ============================================================================

pub fn job_routes(state: AppStateArc) -> Router<AppStateArc> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:job_id", get(get_job).patch(update_job))
        .route("/jobs/:job_id/set-status", post(set_job_status))
        .route("/jobs/:job_id/approve", post(approve_job))
        .route("/jobs/:job_id/reject", post(reject_job))
        .route("/jobs/:job_id/set-needs-approval", post(set_needs_approval))
        .route_layer(middleware::from_fn_with_state(state, require_operator))
}

async fn list_jobs(
    State(state): State<AppStateArc>,
    Query(query): Query<JobQuery>,
) -> Json<Vec<Job>> {
    Json(state.jobs.list(&query).await)
}

async fn create_job(
    State(state): State<AppStateArc>,
    Json(req): Json<JobCreate>,
) -> (StatusCode, Json<Job>) {
    let job = state.jobs.create(&req.title, req.payload, "api").await;
    info!("Job {} created: {}", job.id, job.title);
    (StatusCode::CREATED, Json(job))
}

async fn get_job(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.jobs.get(&job_id).await?))
}

async fn update_job(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.jobs.update(&job_id, update).await?))
}

async fn set_job_status(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
    Json(req): Json<JobStatusUpdate>,
) -> Result<Json<Job>, ApiError> {
    let job = state.jobs.set_status(&job_id, req.status).await?;
    info!("Job {} set to {}", job.id, job.status);
    Ok(Json(job))
}

async fn approve_job(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.jobs.approve(&job_id).await?;
    info!("Job {} approved", job.id);
    Ok(Json(job))
}

async fn reject_job(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state.jobs.reject(&job_id).await?;
    info!("Job {} rejected", job.id);
    Ok(Json(job))
}

/// Test harness hook; invisible unless test endpoints are enabled
async fn set_needs_approval(
    State(state): State<AppStateArc>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    if !state.enable_test_endpoints {
        return Err(detail(StatusCode::NOT_FOUND, "Not found"));
    }
    Ok(Json(
        state
            .jobs
            .set_status(&job_id, JobStatus::NeedsApproval)
            .await?,
    ))
}

// ============================================================================
// Slack Routes (signature checked inside)
// ============================================================================

pub fn slack_routes() -> Router<AppStateArc> {
    Router::new().route("/integrations/slack/events", post(slack_events))
}

async fn slack_events(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    state
        .slack
        .handle(&headers, &body, chrono::Utc::now().timestamp())
        .await
        .map(Json)
        .map_err(|(status, message)| detail(status, message))
}

// ============================================================================
// Supervisor Routes (operator required)
// ============================================================================

pub fn supervisor_routes(state: AppStateArc) -> Router<AppStateArc> {
    Router::new()
        .route("/supervisor/plan", post(plan))
        .route("/supervisor/execute", post(execute))
        .route("/supervisor/tools", get(list_tools))
        .route_layer(middleware::from_fn_with_state(state, require_operator))
}

async fn plan(
    State(state): State<AppStateArc>,
    Json(req): Json<PlanRequest>,
) -> Json<PlanResponse> {
    Json(state.orchestrator.plan(&req).await)
}

async fn execute(
    State(state): State<AppStateArc>,
    Json(req): Json<ExecuteRequest>,
) -> Json<ExecuteResponse> {
    Json(state.orchestrator.execute(&req).await)
}

async fn list_tools(State(state): State<AppStateArc>) -> Result<Json<Value>, ApiError> {
    let reply = state.gate.list_tools().await.map_err(|e| {
        error!("Tool listing failed: {}", e);
        detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if reply.status >= 400 {
        let message = reply
            .body
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or("Tool gate error")
            .to_string();
        return Err(detail(StatusCode::BAD_GATEWAY, message));
    }
    Ok(Json(reply.body))
}
