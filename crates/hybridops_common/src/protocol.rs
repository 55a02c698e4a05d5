//! Wire types shared by the supervisor API, the tool gate and the CLI.

use crate::tools::ToolInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Tool parameters as they travel on the wire
pub type ToolParams = Map<String, Value>;

/// Header carrying the service-to-service shared secret
pub const SHARED_SECRET_HEADER: &str = "X-MCP-SECRET";

/// Outcome tag used by every response in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Plan,
    Ok,
    Unclear,
    Error,
}

// ============================================================================
// Supervisor: plan / execute
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub text: String,
    /// de | bs | en; detected from `text` when absent
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub status: Status,
    pub language: String,
    pub summary: Vec<String>,
    pub plan: Vec<String>,
    pub tools: Vec<String>,
    pub tool_type: String,
    pub tool_type_localized: String,
    pub confirm_question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_params: Option<ToolParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Must read "EXECUTE <ACTION>"
    pub execute_command: String,
    #[serde(default)]
    pub confirm_token: String,
    pub tool: String,
    #[serde(default)]
    pub params: ToolParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub status: Status,
    pub language: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tool gate: run / tools
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRunRequest {
    pub tool: String,
    #[serde(default)]
    pub params: ToolParams,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRunResponse {
    pub status: Status,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_confirm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_summary: Option<String>,
}

impl ToolRunResponse {
    pub fn ok(tool: &str, result: Value) -> Self {
        Self {
            status: Status::Ok,
            tool: tool.to_string(),
            result: Some(result),
            error: None,
            require_confirm: None,
            confirm_token: None,
            plan_summary: None,
        }
    }

    pub fn error(tool: &str, error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            tool: tool.to_string(),
            result: None,
            error: Some(error.into()),
            require_confirm: None,
            confirm_token: None,
            plan_summary: None,
        }
    }

    pub fn plan(tool: &str, confirm_token: String, plan_summary: String) -> Self {
        Self {
            status: Status::Plan,
            tool: tool.to_string(),
            result: None,
            error: None,
            require_confirm: Some(true),
            confirm_token: Some(confirm_token),
            plan_summary: Some(plan_summary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsListResponse {
    pub tools: BTreeMap<String, ToolInfo>,
}

// ============================================================================
// Operator login
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Operator,
}

/// Authenticated operator identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_request_defaults() {
        let req: ToolRunRequest = serde_json::from_value(json!({"tool": "jobs.list"})).unwrap();
        assert!(req.params.is_empty());
        assert!(!req.confirm);
        assert!(req.confirm_token.is_none());
    }

    #[test]
    fn test_plan_response_omits_absent_fields() {
        let resp = ToolRunResponse::plan("jobs.create", "tok".into(), "Create job: 'X'".into());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "plan");
        assert_eq!(json["require_confirm"], true);
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_execute_request_token_defaults_empty() {
        let req: ExecuteRequest = serde_json::from_value(json!({
            "execute_command": "EXECUTE LIST",
            "tool": "jobs.list"
        }))
        .unwrap();
        assert_eq!(req.confirm_token, "");
    }
}
