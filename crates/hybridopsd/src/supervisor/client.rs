//! Client for the tool-execution service

use async_trait::async_trait;
use hybridops_common::config::ToolGateClientSettings;
use hybridops_common::error::OpsError;
use hybridops_common::protocol::{ToolRunRequest, SHARED_SECRET_HEADER};
use serde_json::Value;
use std::time::Duration;

/// Raw `/run` or `/tools` reply: HTTP status plus decoded body
#[derive(Debug, Clone, PartialEq)]
pub struct GateReply {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait ToolGateClient: Send + Sync {
    /// POST /run. Transport failures and timeouts are `OpsError::Downstream`.
    async fn run(&self, req: &ToolRunRequest) -> Result<GateReply, OpsError>;

    /// GET /tools
    async fn list_tools(&self) -> Result<GateReply, OpsError>;
}

pub struct HttpToolGateClient {
    base_url: String,
    shared_secret: String,
    run_timeout: Duration,
    list_timeout: Duration,
    client: reqwest::Client,
}

impl HttpToolGateClient {
    pub fn new(settings: &ToolGateClientSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            shared_secret: settings.shared_secret.clone(),
            run_timeout: settings.run_timeout(),
            list_timeout: settings.list_timeout(),
            client,
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<GateReply, OpsError> {
        let response = request
            .header(SHARED_SECRET_HEADER, &self.shared_secret)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OpsError::Downstream(format!("Invalid tool gate response: {}", e)))?;

        Ok(GateReply { status, body })
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> OpsError {
    if e.is_timeout() {
        OpsError::Downstream(format!(
            "Tool gate timeout after {} seconds",
            timeout.as_secs()
        ))
    } else {
        OpsError::Downstream(format!("Tool gate unreachable: {}", e))
    }
}

#[async_trait]
impl ToolGateClient for HttpToolGateClient {
    async fn run(&self, req: &ToolRunRequest) -> Result<GateReply, OpsError> {
        let url = format!("{}/run", self.base_url);
        self.send(self.client.post(url).json(req), self.run_timeout)
            .await
    }

    async fn list_tools(&self) -> Result<GateReply, OpsError> {
        let url = format!("{}/tools", self.base_url);
        self.send(self.client.get(url), self.list_timeout).await
    }
}
