//! Supervisor API backend - the only place toolgated performs side effects

use async_trait::async_trait;
use hybridops_common::tools::HttpMethod;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Longest raw (non-JSON) body excerpt kept in an error result
const RAW_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("API request failed: {0}")]
    Transport(String),
}

/// HTTP status and decoded body of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// One request against the supervisor API
#[async_trait]
pub trait ApiBackend: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, BackendError>;
}

/// reqwest-backed client with a fixed per-call timeout
pub struct HttpApiBackend {
    base_url: String,
    bearer: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpApiBackend {
    pub fn new(base_url: &str, bearer: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: bearer.to_string(),
            timeout_secs: timeout.as_secs(),
            client,
        })
    }
}

#[async_trait]
impl ApiBackend for HttpApiBackend {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Patch => self.client.patch(&url),
        };
        if !self.bearer.is_empty() {
            req = req.bearer_auth(&self.bearer);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        debug!("{} {} -> {}", method.as_str(), path, status);

        Ok(ApiResponse::new(status, decode_body(&text)))
    }
}

/// JSON body, or the first few hundred characters under "raw"
fn decode_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let raw: String = text.chars().take(RAW_BODY_LIMIT).collect();
            json!({ "raw": raw })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_body() {
        assert_eq!(decode_body(r#"{"id":"j1"}"#), json!({"id": "j1"}));
        assert_eq!(decode_body("[1,2]"), json!([1, 2]));
    }

    #[test]
    fn test_decode_non_json_body_is_truncated() {
        let html = "<html>".repeat(200);
        let decoded = decode_body(&html);
        assert_eq!(decoded["raw"].as_str().unwrap().len(), RAW_BODY_LIMIT);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend =
            HttpApiBackend::new("http://api:8000/", "", Duration::from_secs(10)).unwrap();
        assert_eq!(backend.base_url, "http://api:8000");
        assert_eq!(backend.timeout_secs, 10);
    }

    #[test]
    fn test_status_classification() {
        assert!(ApiResponse::new(201, Value::Null).is_success());
        assert!(!ApiResponse::new(404, Value::Null).is_success());
    }
}
