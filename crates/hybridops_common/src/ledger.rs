//! Confirm-token ledger: single-use, optionally expiring tokens
//!
//! A token binds a tool name to its parameters. It is valid only while it is
//! in the ledger and is removed by the first successful validation. With a
//! TTL configured, records older than the TTL are swept before every issue
//! and validate call. Every operation holds the lock for its whole
//! read-modify-write, so two concurrent validations of one token cannot both
//! succeed.

use crate::protocol::ToolParams;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Validity window used by the tool gate
pub const TOOLGATE_TOKEN_TTL: Duration = Duration::from_secs(300);

/// Absent, expired and wrong-tool tokens all surface as this one error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid or expired confirm_token")]
pub struct ConfirmError;

/// A stored binding
#[derive(Debug, Clone)]
pub struct ConfirmRecord {
    pub tool: String,
    pub params: ToolParams,
    pub created_at: Instant,
}

/// Shared, cloneable token ledger
#[derive(Debug, Clone)]
pub struct TokenLedger {
    records: Arc<Mutex<HashMap<String, ConfirmRecord>>>,
    ttl: Option<Duration>,
}

impl TokenLedger {
    /// Ledger whose tokens live until consumed
    pub fn without_ttl() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            ttl: None,
        }
    }

    /// Ledger whose tokens also expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn sweep_locked(&self, records: &mut HashMap<String, ConfirmRecord>, now: Instant) {
        if let Some(ttl) = self.ttl {
            let before = records.len();
            records.retain(|_, r| now.duration_since(r.created_at) <= ttl);
            let swept = before - records.len();
            if swept > 0 {
                debug!("Swept {} expired confirm tokens", swept);
            }
        }
    }

    /// Bind `tool` and `params` to a fresh token
    pub async fn issue(&self, tool: &str, params: ToolParams) -> String {
        let mut records = self.records.lock().await;
        let now = Instant::now();
        self.sweep_locked(&mut records, now);

        let token = Uuid::new_v4().to_string();
        records.insert(
            token.clone(),
            ConfirmRecord {
                tool: tool.to_string(),
                params,
                created_at: now,
            },
        );
        token
    }

    /// Check `token` against `tool` and remove it. Returns the bound params.
    ///
    /// A record whose tool differs stays in place: the binding is immutable
    /// and the rightful caller may still present it.
    pub async fn validate_and_consume(
        &self,
        token: &str,
        tool: &str,
    ) -> Result<ToolParams, ConfirmError> {
        let mut records = self.records.lock().await;
        self.sweep_locked(&mut records, Instant::now());

        match records.get(token) {
            Some(record) if record.tool == tool => {}
            _ => return Err(ConfirmError),
        }

        records
            .remove(token)
            .map(|record| record.params)
            .ok_or(ConfirmError)
    }

    /// Drop expired records; no-op without a TTL
    pub async fn sweep_expired(&self) {
        let mut records = self.records.lock().await;
        self.sweep_locked(&mut records, Instant::now());
    }

    /// Live record count
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// First 8 characters for log lines
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn params(job_id: &str) -> ToolParams {
        let mut p = ToolParams::new();
        p.insert("job_id".to_string(), Value::String(job_id.to_string()));
        p
    }

    #[tokio::test]
    async fn test_issue_then_consume_once() {
        let ledger = TokenLedger::without_ttl();
        let token = ledger.issue("jobs.approve", params("j1")).await;

        let bound = ledger.validate_and_consume(&token, "jobs.approve").await.unwrap();
        assert_eq!(bound.get("job_id"), Some(&json!("j1")));

        assert_eq!(
            ledger.validate_and_consume(&token, "jobs.approve").await,
            Err(ConfirmError)
        );
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_every_tool_consumes_exactly_once() {
        let ledger = TokenLedger::with_ttl(TOOLGATE_TOKEN_TTL);
        for tool in crate::tools::all() {
            let token = ledger.issue(tool.name, ToolParams::new()).await;
            assert!(ledger.validate_and_consume(&token, tool.name).await.is_ok());
            for _ in 0..3 {
                assert!(ledger.validate_and_consume(&token, tool.name).await.is_err());
            }
        }
    }

    #[tokio::test]
    async fn test_wrong_tool_fails() {
        let ledger = TokenLedger::without_ttl();
        let token = ledger.issue("jobs.list", ToolParams::new()).await;
        assert_eq!(
            ledger.validate_and_consume(&token, "jobs.approve").await,
            Err(ConfirmError)
        );
    }

    #[tokio::test]
    async fn test_wrong_tool_for_every_pair() {
        let ledger = TokenLedger::without_ttl();
        let tools = crate::tools::all();
        for t1 in tools {
            for t2 in tools.iter().filter(|t| t.name != t1.name) {
                let token = ledger.issue(t1.name, ToolParams::new()).await;
                assert!(ledger.validate_and_consume(&token, t2.name).await.is_err());
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_token_fails() {
        let ledger = TokenLedger::without_ttl();
        assert_eq!(
            ledger.validate_and_consume("not-a-token", "jobs.list").await,
            Err(ConfirmError)
        );
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let ledger = TokenLedger::without_ttl();
        let a = ledger.issue("jobs.list", ToolParams::new()).await;
        let b = ledger.issue("jobs.list", ToolParams::new()).await;
        assert_ne!(a, b);
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_token_fails() {
        let ledger = TokenLedger::with_ttl(Duration::from_millis(50));
        let token = ledger.issue("jobs.create", ToolParams::new()).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(
            ledger.validate_and_consume(&token, "jobs.create").await,
            Err(ConfirmError)
        );
    }

    #[tokio::test]
    async fn test_issue_sweeps_expired_records() {
        let ledger = TokenLedger::with_ttl(Duration::from_millis(50));
        ledger.issue("jobs.create", ToolParams::new()).await;
        ledger.issue("jobs.create", ToolParams::new()).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        ledger.issue("jobs.reject", ToolParams::new()).await;
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let ledger = TokenLedger::without_ttl();
        let token = ledger.issue("jobs.list", ToolParams::new()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        ledger.sweep_expired().await;
        assert!(ledger.validate_and_consume(&token, "jobs.list").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_consume_succeeds_once() {
        let ledger = TokenLedger::without_ttl();
        let token = ledger.issue("jobs.approve", params("j9")).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                ledger.validate_and_consume(&token, "jobs.approve").await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("12345678"), "***");
        assert_eq!(mask_token("1234567890abcdef"), "12345678...");
    }
}
