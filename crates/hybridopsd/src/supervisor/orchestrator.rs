//! Plan/Execute Orchestrator
//!
//! Two calls per action. `plan` parses free text and, for any resolved
//! tool, issues a confirm token (reads included). `execute` needs the
//! imperative `EXECUTE <ACTION>` command plus that token, consumes it and
//! forwards the bound parameters to the tool gate, completing the gate's own
//! confirm handshake on the way. The orchestrator keeps no per-request state
//! outside the token ledger.

use super::client::{GateReply, ToolGateClient};
use hybridops_common::error::OpsError;
use hybridops_common::i18n::{self, Translations};
use hybridops_common::intent::parse_intent;
use hybridops_common::lang::{detect_language, Language};
use hybridops_common::ledger::{mask_token, TokenLedger};
use hybridops_common::normalize::normalize_result;
use hybridops_common::protocol::{
    ExecuteRequest, ExecuteResponse, PlanRequest, PlanResponse, Status, ToolParams,
    ToolRunRequest, ToolRunResponse,
};
use hybridops_common::tools::{self, ToolKind};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const TOKEN_REQUIRED: &str = "confirm_token required (Stufe-5)";
const EXECUTION_FAILED: &str = "Execution failed";

fn execute_command_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^EXECUTE\s+(.+)").expect("static regex"))
}

pub struct Orchestrator {
    ledger: TokenLedger,
    gate: Arc<dyn ToolGateClient>,
    require_2step_for_read: bool,
}

impl Orchestrator {
    pub fn new(gate: Arc<dyn ToolGateClient>, require_2step_for_read: bool) -> Self {
        if !require_2step_for_read {
            warn!("REQUIRE_2STEP_FOR_READ is off; READ tools skip the confirm token");
        }
        Self {
            ledger: TokenLedger::without_ttl(),
            gate,
            require_2step_for_read,
        }
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    fn needs_token(&self, kind: Option<ToolKind>) -> bool {
        self.require_2step_for_read || kind != Some(ToolKind::Read)
    }

    // ------------------------------------------------------------------------
    // Plan
    // ------------------------------------------------------------------------

    pub async fn plan(&self, req: &PlanRequest) -> PlanResponse {
        let text = req.text.trim();
        let lang = req
            .language
            .as_deref()
            .and_then(Language::from_code)
            .unwrap_or_else(|| detect_language(text));
        let t = Translations::for_language(lang);

        let intent = parse_intent(text);
        let descriptor = match tools::lookup(&intent.tool) {
            Some(d) if !intent.is_unclear() => d,
            _ => {
                debug!("Unclear intent ({}): {:?}", lang, text);
                return unclear_response(lang, t);
            }
        };

        let kind_localized = t.kind_label(descriptor.kind);
        let params_json = Value::Object(intent.params.clone()).to_string();

        let mut summary = vec![
            format!("{}: {}", t.understood, text),
            format!("Tool: {}", descriptor.name),
            format!("{}: {}", t.type_label, kind_localized),
        ];
        let mut plan = vec![format!("1. {}", descriptor.description(lang))];
        if !intent.params.is_empty() {
            summary.push(format!("{}: {}", t.parameters, params_json));
            plan.push(format!("2. {}: {}", t.parameters, params_json));
        }

        let confirm_token = if self.needs_token(Some(descriptor.kind)) {
            Some(self.ledger.issue(descriptor.name, intent.params.clone()).await)
        } else {
            None
        };
        info!(
            "Plan {} ({}) token={}",
            descriptor.name,
            descriptor.kind,
            confirm_token.as_deref().map(mask_token).unwrap_or_else(|| "none".into())
        );

        PlanResponse {
            status: Status::Plan,
            language: lang.code().to_string(),
            summary,
            plan,
            tools: vec![descriptor.name.to_string()],
            tool_type: descriptor.kind.as_str().to_string(),
            tool_type_localized: kind_localized.to_string(),
            confirm_question: t.confirm_question.to_string(),
            confirm_token,
            execute_instruction: Some(t.execute_instruction_for(&descriptor.action_name())),
            parsed_tool: Some(descriptor.name.to_string()),
            parsed_params: Some(intent.params),
            suggestions: None,
            error: None,
        }
    }

    // ------------------------------------------------------------------------
    // Execute
    // ------------------------------------------------------------------------

    pub async fn execute(&self, req: &ExecuteRequest) -> ExecuteResponse {
        let lang = detect_language(&req.execute_command);
        let t = Translations::for_language(lang);

        match self.try_execute(req, t).await {
            Ok(result) => {
                info!("Executed {}", req.tool);
                ExecuteResponse {
                    status: Status::Ok,
                    language: lang.code().to_string(),
                    message: t.success.to_string(),
                    result: Some(result),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Execute {} failed ({}): {}", req.tool, e.kind(), e);
                ExecuteResponse {
                    status: Status::Error,
                    language: lang.code().to_string(),
                    message: String::new(),
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_execute(
        &self,
        req: &ExecuteRequest,
        t: &Translations,
    ) -> Result<Map<String, Value>, OpsError> {
        if !execute_command_re().is_match(req.execute_command.trim()) {
            return Err(OpsError::Validation(format!(
                "Invalid command. {}",
                t.execute_instruction_for("ACTION")
            )));
        }

        let kind = tools::lookup(&req.tool).map(|d| d.kind);
        let params = if req.confirm_token.is_empty() {
            if self.needs_token(kind) {
                return Err(OpsError::Validation(TOKEN_REQUIRED.to_string()));
            }
            req.params.clone()
        } else {
            if kind.is_none() {
                return Err(OpsError::UnknownTool(req.tool.clone()));
            }
            let bound = self
                .ledger
                .validate_and_consume(&req.confirm_token, &req.tool)
                .await?;
            info!("Token {} consumed for {}", mask_token(&req.confirm_token), req.tool);
            bound
        };

        let raw = self.forward(&req.tool, params).await?;
        Ok(normalize_result(raw))
    }

    /// Drive the gate: `confirm=true` first, then answer a gate plan with the
    /// gate's own token
    async fn forward(&self, tool: &str, params: ToolParams) -> Result<Option<Value>, OpsError> {
        let first = self
            .gate
            .run(&ToolRunRequest {
                tool: tool.to_string(),
                params: params.clone(),
                confirm: true,
                confirm_token: None,
            })
            .await?;

        let reply = gate_response(first)?;
        match reply.status {
            Status::Ok => Ok(reply.result),
            Status::Plan => {
                let gate_token = reply
                    .confirm_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| OpsError::Downstream("Tool gate plan without token".into()))?;
                debug!("Answering gate plan for {} ({})", tool, mask_token(&gate_token));

                let second = self
                    .gate
                    .run(&ToolRunRequest {
                        tool: tool.to_string(),
                        params,
                        confirm: true,
                        confirm_token: Some(gate_token),
                    })
                    .await?;
                let reply = gate_response(second)?;
                match reply.status {
                    Status::Ok => Ok(reply.result),
                    other => Err(OpsError::Downstream(format!(
                        "Unexpected tool gate status: {:?}",
                        other
                    ))),
                }
            }
            other => Err(OpsError::Downstream(format!(
                "Unexpected tool gate status: {:?}",
                other
            ))),
        }
    }
}

/// Non-2xx or `status: error` -> Downstream; otherwise the typed reply
fn gate_response(reply: GateReply) -> Result<ToolRunResponse, OpsError> {
    let error_text = |body: &Value| {
        ["error", "detail"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or(EXECUTION_FAILED)
            .to_string()
    };

    if reply.status >= 400 {
        return Err(OpsError::Downstream(error_text(&reply.body)));
    }
    let parsed: ToolRunResponse = serde_json::from_value(reply.body.clone())
        .map_err(|e| OpsError::Downstream(format!("Invalid tool gate response: {}", e)))?;
    if parsed.status == Status::Error {
        return Err(OpsError::Downstream(
            parsed.error.unwrap_or_else(|| EXECUTION_FAILED.to_string()),
        ));
    }
    Ok(parsed)
}

fn unclear_response(lang: Language, t: &Translations) -> PlanResponse {
    let suggestions = i18n::suggestions(lang);
    PlanResponse {
        status: Status::Unclear,
        language: lang.code().to_string(),
        summary: vec![t.unclear.to_string()],
        plan: Vec::new(),
        tools: Vec::new(),
        tool_type: String::new(),
        tool_type_localized: String::new(),
        confirm_question: String::new(),
        confirm_token: None,
        execute_instruction: None,
        parsed_tool: None,
        parsed_params: None,
        error: Some(t.unclear_with_suggestions(&suggestions)),
        suggestions: Some(suggestions),
    }
}
