//! Supervisor, tool gate and job API wired together in-process
//!
//! The supervisor talks to a real toolgated router; the tool gate's API
//! backend calls back into the supervisor router with an operator bearer.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use hybridops_common::config::{SupervisorConfig, ToolGateConfig};
use hybridops_common::error::OpsError;
use hybridops_common::protocol::{ToolRunRequest, SHARED_SECRET_HEADER};
use hybridops_common::tools::HttpMethod;
use hybridopsd::auth::SessionAuth;
use hybridopsd::server::{app, AppState};
use hybridopsd::supervisor::{GateReply, ToolGateClient};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use toolgated::{ApiBackend, ApiResponse, BackendError};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "ops@example.com";
const ADMIN_PASSWORD: &str = "correct horse";
const GATE_SECRET: &str = "gate-secret";

/// ToolGateClient over an in-process toolgated router
struct InProcessGate {
    router: Router,
}

impl InProcessGate {
    async fn call(&self, request: Request<Body>) -> Result<GateReply, OpsError> {
        let (status, body) = send(&self.router, request).await;
        Ok(GateReply {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ToolGateClient for InProcessGate {
    async fn run(&self, req: &ToolRunRequest) -> Result<GateReply, OpsError> {
        let body = serde_json::to_string(req).map_err(|e| OpsError::Downstream(e.to_string()))?;
        let request = Request::builder()
            .method("POST")
            .uri("/run")
            .header("content-type", "application/json")
            .header(SHARED_SECRET_HEADER, GATE_SECRET)
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    async fn list_tools(&self) -> Result<GateReply, OpsError> {
        let request = Request::builder()
            .uri("/tools")
            .header(SHARED_SECRET_HEADER, GATE_SECRET)
            .body(Body::empty())
            .unwrap();
        self.call(request).await
    }
}

/// ApiBackend that routes tool calls into the supervisor router
struct SupervisorApi {
    router: Arc<OnceLock<Router>>,
    bearer: String,
}

#[async_trait]
impl ApiBackend for SupervisorApi {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, BackendError> {
        let router = self
            .router
            .get()
            .ok_or_else(|| BackendError::Transport("supervisor not ready".into()))?;
        let mut builder = Request::builder()
            .method(method.as_str())
            .uri(path)
            .header("authorization", format!("Bearer {}", self.bearer));
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let (status, value) = send(router, builder.body(body).unwrap()).await;
        Ok(ApiResponse::new(status.as_u16(), value))
    }
}

struct Harness {
    api: Router,
    gate: Router,
}

fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn supervisor_config() -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.auth.admin_email = ADMIN_EMAIL.to_string();
    config.auth.admin_password_hash = password_hash(ADMIN_PASSWORD);
    config.toolgate.shared_secret = GATE_SECRET.to_string();
    config.jobs.enable_test_endpoints = true;
    config
}

fn harness_with(config: SupervisorConfig) -> Harness {
    let slot: Arc<OnceLock<Router>> = Arc::default();
    let bearer = SessionAuth::new(&config.auth).issue_token(chrono::Utc::now().timestamp());

    let gate_config = ToolGateConfig {
        shared_secret: GATE_SECRET.to_string(),
        ..ToolGateConfig::default()
    };
    let backend = Arc::new(SupervisorApi {
        router: slot.clone(),
        bearer,
    });
    let gate = toolgated::server::app(toolgated::server::AppState::new(&gate_config, backend));

    let client = Arc::new(InProcessGate {
        router: gate.clone(),
    });
    let api = app(AppState::new(&config, client));
    let _ = slot.set(api.clone());

    Harness { api, gate }
}

fn harness() -> Harness {
    harness_with(supervisor_config())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(router: &Router, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    send(router, builder.body(Body::from(body.to_string())).unwrap()).await
}

async fn get(router: &Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    send(router, builder.body(Body::empty()).unwrap()).await
}

async fn login(h: &Harness) -> String {
    let (status, body) = post(
        &h.api,
        "/auth/login",
        None,
        json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn plan(h: &Harness, bearer: &str, text: &str) -> Value {
    let (status, body) = post(&h.api, "/supervisor/plan", Some(bearer), json!({"text": text})).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn execute(h: &Harness, bearer: &str, plan: &Value) -> Value {
    let tool = plan["parsed_tool"].as_str().unwrap();
    let action = tool.rsplit('.').next().unwrap().to_uppercase();
    let (status, body) = post(
        &h.api,
        "/supervisor/execute",
        Some(bearer),
        json!({
            "execute_command": format!("EXECUTE {}", action),
            "confirm_token": plan["confirm_token"],
            "tool": tool,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_returns_operator() {
    let h = harness();
    let (status, body) = post(
        &h.api,
        "/auth/login",
        None,
        json!({"email": "OPS@example.com", "password": ADMIN_PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().starts_with("mvp."));
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_login_wrong_password_then_rate_limited() {
    let h = harness();
    let wrong = json!({"email": ADMIN_EMAIL, "password": "nope"});
    for _ in 0..10 {
        let (status, body) = post(&h.api, "/auth/login", None, wrong.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
    }
    let (status, body) = post(&h.api, "/auth/login", None, wrong).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "Too many attempts, try later");
}

#[tokio::test]
async fn test_login_without_admin_configured() {
    let mut config = supervisor_config();
    config.auth.admin_password_hash.clear();
    let h = harness_with(config);

    let (status, body) = post(
        &h.api,
        "/auth/login",
        None,
        json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Admin not configured (ADMIN_EMAIL/ADMIN_PASSWORD_HASH)");
}

#[tokio::test]
async fn test_protected_routes_need_bearer() {
    let h = harness();

    let (status, _) = get(&h.api, "/jobs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&h.api, "/jobs", Some("mvp.1.forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(&h.api, "/supervisor/plan", None, json!({"text": "List jobs"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&h.api, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ============================================================================
// Plan / Execute through the tool gate
// ============================================================================

#[tokio::test]
async fn test_list_jobs_plan_execute_and_token_reuse() {
    let h = harness();
    let bearer = login(&h).await;
    post(&h.api, "/jobs", Some(&bearer), json!({"title": "Existing"})).await;

    let planned = plan(&h, &bearer, "List jobs").await;
    assert_eq!(planned["status"], "plan");
    assert_eq!(planned["language"], "en");
    assert_eq!(planned["tool_type"], "READ");
    assert_eq!(planned["execute_instruction"], "Type: EXECUTE LIST");
    assert!(planned["confirm_token"].is_string());

    let done = execute(&h, &bearer, &planned).await;
    assert_eq!(done["status"], "ok", "{}", done);
    assert_eq!(done["message"], "Successfully executed");
    let items = done["result"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Existing");

    let again = execute(&h, &bearer, &planned).await;
    assert_eq!(again["status"], "error");
    assert_eq!(again["error"], "Invalid or expired confirm_token");
}

#[tokio::test]
async fn test_create_then_approve_through_both_confirmations() {
    let h = harness();
    let bearer = login(&h).await;

    let planned = plan(&h, &bearer, "Create job \"nightly backup\"").await;
    assert_eq!(planned["tool_type"], "WRITE");
    assert_eq!(planned["parsed_params"]["title"], "Nightly Backup");

    let created = execute(&h, &bearer, &planned).await;
    assert_eq!(created["status"], "ok", "{}", created);
    assert_eq!(created["result"]["status"], "queued");
    let job_id = created["result"]["id"].as_str().unwrap().to_string();

    // Approval only applies to jobs awaiting it
    let planned = plan(&h, &bearer, &format!("approve job {}", job_id)).await;
    let refused = execute(&h, &bearer, &planned).await;
    assert_eq!(refused["status"], "error");
    assert_eq!(
        refused["error"],
        "Cannot approve job with status 'queued'. Must be 'needs_approval'."
    );

    let (status, _) = post(
        &h.api,
        &format!("/jobs/{}/set-needs-approval", job_id),
        Some(&bearer),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let planned = plan(&h, &bearer, &format!("approve job {}", job_id)).await;
    let approved = execute(&h, &bearer, &planned).await;
    assert_eq!(approved["status"], "ok", "{}", approved);
    assert_eq!(approved["result"]["status"], "approved");

    let (_, job) = get(&h.api, &format!("/jobs/{}", job_id), Some(&bearer)).await;
    assert_eq!(job["status"], "approved");
    assert_eq!(job["title"], "Nightly Backup");
}

#[tokio::test]
async fn test_unclear_text_in_german() {
    let h = harness();
    let bearer = login(&h).await;

    let planned = plan(&h, &bearer, "asdf qqq").await;
    assert_eq!(planned["status"], "unclear");
    assert_eq!(planned["language"], "de");
    assert!(planned.get("confirm_token").is_none());
    assert_eq!(planned["suggestions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_execute_without_token_is_refused() {
    let h = harness();
    let bearer = login(&h).await;

    let (_, body) = post(
        &h.api,
        "/supervisor/execute",
        Some(&bearer),
        json!({"execute_command": "EXECUTE LIST", "confirm_token": "", "tool": "jobs.list"}),
    )
    .await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "confirm_token required (Stufe-5)");
}

#[tokio::test]
async fn test_supervisor_lists_gate_tools() {
    let h = harness();
    let bearer = login(&h).await;

    let (status, body) = get(&h.api, "/supervisor/tools", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tools"]["jobs.approve"]["type"], "WRITE");
    assert_eq!(body["tools"].as_object().unwrap().len(), 8);
}

#[tokio::test]
async fn test_supervisor_tools_with_wrong_gate_secret() {
    let config = supervisor_config();
    // The in-process client always sends GATE_SECRET
    let slot: Arc<OnceLock<Router>> = Arc::default();
    let gate = toolgated::server::app(toolgated::server::AppState::new(
        &ToolGateConfig {
            shared_secret: "rotated".to_string(),
            ..ToolGateConfig::default()
        },
        Arc::new(SupervisorApi {
            router: slot,
            bearer: String::new(),
        }),
    ));
    let api = app(AppState::new(&config, Arc::new(InProcessGate { router: gate })));
    let bearer = SessionAuth::new(&config.auth).issue_token(chrono::Utc::now().timestamp());

    let (status, body) = get(&api, "/supervisor/tools", Some(&bearer)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["detail"], "Invalid MCP secret");
}

// ============================================================================
// Slack
// ============================================================================

#[tokio::test]
async fn test_slack_url_verification_and_dedupe() {
    let h = harness();
    let bearer = login(&h).await;

    let (status, body) = post(
        &h.api,
        "/integrations/slack/events",
        None,
        json!({"type": "url_verification", "challenge": "xyz"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["challenge"], "xyz");

    let event = json!({
        "type": "event_callback",
        "event_id": "Ev42",
        "event": {"type": "app_mention", "user": "U1", "channel": "C1", "text": "restart worker", "ts": "1.5"}
    });
    let (_, first) = post(&h.api, "/integrations/slack/events", None, event.clone()).await;
    assert!(first["job_id"].is_string());
    let (_, second) = post(&h.api, "/integrations/slack/events", None, event).await;
    assert_eq!(second["duplicate"], true);

    let (_, jobs) = get(&h.api, "/jobs?search=restart", Some(&bearer)).await;
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["title"], "Slack: restart worker");
    assert_eq!(jobs[0]["source"], "slack");
}

#[tokio::test]
async fn test_gate_simulated_mention_lands_as_job() {
    let h = harness();
    let bearer = login(&h).await;

    let params = json!({"text": "hello from the gate"});
    let (_, planned) = post(
        &h.gate,
        "/run",
        None,
        json!({"tool": "slack.simulate_mention", "params": params, "confirm": false}),
    )
    .await;
    // No shared secret header on a direct call
    assert_eq!(planned["detail"], "Invalid MCP secret");

    let request = |body: Value| {
        Request::builder()
            .method("POST")
            .uri("/run")
            .header("content-type", "application/json")
            .header(SHARED_SECRET_HEADER, GATE_SECRET)
            .body(Body::from(body.to_string()))
            .unwrap()
    };
    let (_, planned) = send(
        &h.gate,
        request(json!({"tool": "slack.simulate_mention", "params": params, "confirm": false})),
    )
    .await;
    assert_eq!(planned["status"], "plan");

    let (_, done) = send(
        &h.gate,
        request(json!({
            "tool": "slack.simulate_mention",
            "params": params,
            "confirm": true,
            "confirm_token": planned["confirm_token"],
        })),
    )
    .await;
    assert_eq!(done["status"], "ok", "{}", done);
    let job_id = done["result"]["job_id"].as_str().unwrap();

    let (_, job) = get(&h.api, &format!("/jobs/{}", job_id), Some(&bearer)).await;
    assert_eq!(job["title"], "Slack: hello from the gate");
    assert_eq!(job["payload"]["user"], "U_TEST");
}
