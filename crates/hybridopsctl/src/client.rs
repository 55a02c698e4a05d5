//! HTTP client for the supervisor API

use anyhow::{anyhow, Context, Result};
use hybridops_common::config::ToolGateClientSettings;
use hybridops_common::protocol::{
    ExecuteRequest, ExecuteResponse, LoginRequest, LoginResponse, PlanRequest, PlanResponse,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const REQUEST_OVERHEAD: Duration = Duration::from_secs(15);
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// A WRITE execute is two gate round trips; wait for both plus overhead
pub fn request_timeout() -> Duration {
    ToolGateClientSettings::default().run_timeout() * 2 + REQUEST_OVERHEAD
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("Not logged in. Pass --token or set HYBRIDOPS_TOKEN."))?;
        Ok(request.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Cannot reach supervisor at {}", self.base_url))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let detail = body
                .get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(anyhow!("{} ({})", detail, status));
        }
        serde_json::from_value(body).context("Unexpected response from supervisor")
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.client.post(self.url("/auth/login")).json(&req))
            .await
    }

    pub async fn plan(&self, req: &PlanRequest) -> Result<PlanResponse> {
        let request = self.authorized(self.client.post(self.url("/supervisor/plan")))?;
        self.send(request.json(req)).await
    }

    pub async fn execute(&self, req: &ExecuteRequest) -> Result<ExecuteResponse> {
        let request = self.authorized(self.client.post(self.url("/supervisor/execute")))?;
        self.send(request.json(req)).await
    }

    pub async fn tools(&self) -> Result<Value> {
        let request = self.authorized(self.client.get(self.url("/supervisor/tools")))?;
        self.send(request).await
    }

    /// Health plus version, on a short budget
    pub async fn status(&self) -> Result<Value> {
        let health: Value = self
            .send(self.client.get(self.url("/health")).timeout(STATUS_TIMEOUT))
            .await?;
        let version: Value = self
            .send(self.client.get(self.url("/version")).timeout(STATUS_TIMEOUT))
            .await?;
        Ok(serde_json::json!({
            "api_url": self.base_url,
            "health": health,
            "version": version,
        }))
    }
}
