//! Tool gate - second, independent confirm-before-act check
//!
//! READ tools run immediately. WRITE and TEST tools answer the first call
//! with a plan and a gate-issued token; only a follow-up call carrying
//! `confirm=true` and that token runs the tool, using the parameters bound
//! when the token was issued. Tokens from any other component are never
//! trusted.

use crate::executor::{error_message, ToolExecutor, DEFAULT_CREATE_TITLE};
use hybridops_common::ledger::{mask_token, TokenLedger};
use hybridops_common::protocol::{ToolParams, ToolRunRequest, ToolRunResponse};
use hybridops_common::tools::{self, ToolKind};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ToolGate {
    executor: ToolExecutor,
    ledger: TokenLedger,
}

impl ToolGate {
    pub fn new(executor: ToolExecutor, ledger: TokenLedger) -> Self {
        Self { executor, ledger }
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub async fn run(&self, req: ToolRunRequest) -> ToolRunResponse {
        let tool = req.tool.as_str();

        let descriptor = match tools::lookup(tool) {
            Some(d) => d,
            None => {
                warn!("Unknown tool requested: {}", tool);
                return ToolRunResponse::error(tool, format!("Unknown tool: {}", tool));
            }
        };

        if descriptor.kind == ToolKind::Read {
            return self.dispatch(tool, &req.params).await;
        }

        match req.confirm_token.as_deref().filter(|t| req.confirm && !t.is_empty()) {
            Some(token) => match self.ledger.validate_and_consume(token, tool).await {
                Ok(bound) => {
                    info!("Gate token {} consumed for {}", mask_token(token), tool);
                    self.dispatch(tool, &bound).await
                }
                Err(e) => {
                    warn!("Gate token {} rejected for {}", mask_token(token), tool);
                    ToolRunResponse::error(tool, e.to_string())
                }
            },
            None => {
                let summary = plan_summary(tool, &req.params);
                let token = self.ledger.issue(tool, req.params).await;
                info!("Gate plan for {} ({})", tool, mask_token(&token));
                ToolRunResponse::plan(tool, token, summary)
            }
        }
    }

    async fn dispatch(&self, tool: &str, params: &ToolParams) -> ToolRunResponse {
        let response = self.executor.execute(tool, params).await;
        if response.is_success() {
            ToolRunResponse::ok(tool, response.body)
        } else {
            ToolRunResponse::error(tool, error_message(&response.body))
        }
    }
}

fn param_text(params: &ToolParams, key: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "(none)".to_string(),
        Some(other) => other.to_string(),
    }
}

/// One-line description of what a confirmed call would do
pub fn plan_summary(tool: &str, params: &ToolParams) -> String {
    match tool {
        "jobs.create" => {
            let title = match params.get("title") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                _ => DEFAULT_CREATE_TITLE.to_string(),
            };
            format!("Create job: '{}'", title)
        }
        "jobs.approve" => format!("Approve job: {}", param_text(params, "job_id")),
        "jobs.reject" => format!("Reject job: {}", param_text(params, "job_id")),
        "jobs.update" => format!("Update job: {}", param_text(params, "job_id")),
        "jobs.set_needs_approval" => {
            format!("Set job to needs_approval: {}", param_text(params, "job_id"))
        }
        "slack.simulate_mention" => {
            let text = match params.get("text") {
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            format!("Simulate Slack mention: '{}'", text)
        }
        _ => format!(
            "Execute {} with params: {}",
            tool,
            Value::Object(params.clone())
        ),
    }
}
