//! Tool Executor - dispatches a named tool to its one downstream API call.
//!
//! Pure dispatch: no confirmation logic lives here. Every failure comes back
//! as an `ApiResponse` with a client or gateway status, never as a panic or
//! an escaped error.

use crate::backend::{ApiBackend, ApiResponse};
use hybridops_common::protocol::ToolParams;
use hybridops_common::tools::{self, HttpMethod, ToolDescriptor};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_CREATE_TITLE: &str = "Untitled Job";
const DEFAULT_MENTION_TEXT: &str = "Test mention";
const DEFAULT_MENTION_USER: &str = "U_TEST";
const DEFAULT_MENTION_CHANNEL: &str = "C_TEST";

/// Fully resolved downstream request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// A parameter value counts as present when it is neither null nor ""
fn present<'a>(params: &'a ToolParams, key: &str) -> Option<&'a Value> {
    match params.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

/// Percent-encoded so a value stays inside its own segment
fn as_path_segment(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    urlencoding::encode(&raw).into_owned()
}

fn string_or(params: &ToolParams, key: &str, default: &str) -> Value {
    present(params, key)
        .cloned()
        .unwrap_or_else(|| Value::String(default.to_string()))
}

fn client_error(status: u16, message: String) -> ApiResponse {
    ApiResponse::new(status, json!({ "error": message }))
}

/// Resolve `tool` + `params` into a concrete request without performing it
pub fn build_call(tool: &str, params: &ToolParams) -> Result<ApiCall, ApiResponse> {
    let descriptor = tools::lookup(tool)
        .ok_or_else(|| client_error(404, format!("Unknown tool: {}", tool)))?;

    for required in descriptor.required_params {
        if present(params, required).is_none() {
            return Err(client_error(400, format!("{} required", required)));
        }
    }

    Ok(ApiCall {
        method: descriptor.method,
        path: render_path(descriptor, params),
        body: request_body(descriptor, params),
    })
}

fn render_path(descriptor: &ToolDescriptor, params: &ToolParams) -> String {
    let mut path = descriptor.path_template.to_string();
    for name in descriptor.accepted_params {
        let placeholder = format!("{{{}}}", name);
        if path.contains(&placeholder) {
            if let Some(value) = present(params, name) {
                path = path.replace(&placeholder, &as_path_segment(value));
            }
        }
    }
    path
}

fn request_body(descriptor: &ToolDescriptor, params: &ToolParams) -> Option<Value> {
    match descriptor.name {
        "jobs.create" => Some(json!({
            "title": string_or(params, "title", DEFAULT_CREATE_TITLE),
            "payload": present(params, "payload").cloned().unwrap_or_else(|| json!({})),
        })),
        "jobs.update" => {
            let mut body = Map::new();
            for field in ["title", "payload"] {
                if let Some(v) = present(params, field) {
                    body.insert(field.to_string(), v.clone());
                }
            }
            Some(Value::Object(body))
        }
        "slack.simulate_mention" => Some(json!({
            "type": "event_callback",
            "event_id": format!("test-{}", Uuid::new_v4()),
            "event": {
                "type": "app_mention",
                "user": string_or(params, "user", DEFAULT_MENTION_USER),
                "channel": string_or(params, "channel", DEFAULT_MENTION_CHANNEL),
                "text": string_or(params, "text", DEFAULT_MENTION_TEXT),
                "ts": format!("{:.6}", chrono::Utc::now().timestamp_micros() as f64 / 1e6),
            },
        })),
        _ => None,
    }
}

/// Executes tools against an injected backend
#[derive(Clone)]
pub struct ToolExecutor {
    backend: Arc<dyn ApiBackend>,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn ApiBackend>) -> Self {
        Self { backend }
    }

    /// Run `tool`; returns the downstream (status, body)
    pub async fn execute(&self, tool: &str, params: &ToolParams) -> ApiResponse {
        let call = match build_call(tool, params) {
            Ok(call) => call,
            Err(rejected) => {
                warn!("Rejected {} before dispatch: {}", tool, rejected.body);
                return rejected;
            }
        };

        info!("Dispatching {} -> {} {}", tool, call.method.as_str(), call.path);
        match self.backend.request(call.method, &call.path, call.body).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} failed in transport: {}", tool, e);
                client_error(502, e.to_string())
            }
        }
    }
}

/// Error text from a failed downstream body: detail, then error, then the body
pub fn error_message(body: &Value) -> String {
    for key in ["detail", "error"] {
        match body.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
        }
    }
    body.to_string()
}
