//! Slack Events API intake
//!
//! Mentions and direct messages become queued jobs. Each `event_id` is
//! handled once; bot messages are skipped so replies cannot loop.

use crate::idempotency::IdempotencyStore;
use crate::jobs::JobStore;
use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use hybridops_common::secret::constant_time_eq;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Requests older (or newer) than this are treated as replays
pub const SIGNATURE_MAX_SKEW_SECS: i64 = 300;
const TITLE_TEXT_LIMIT: usize = 100;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// `v0=<hex hmac-sha256(secret, "v0:<ts>:<body>")>`
pub fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> bool {
    let Ok(ts) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    if now.abs_diff(ts) > SIGNATURE_MAX_SKEW_SECS.unsigned_abs() {
        return false;
    }
    let expected = compute_signature(secret, timestamp, body);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

#[derive(Clone)]
pub struct SlackIntake {
    signing_secret: String,
    processed: IdempotencyStore,
    jobs: JobStore,
}

impl SlackIntake {
    pub fn new(signing_secret: &str, processed: IdempotencyStore, jobs: JobStore) -> Self {
        if signing_secret.is_empty() {
            warn!("SLACK_SIGNING_SECRET not set; Slack signatures are not verified");
        }
        Self {
            signing_secret: signing_secret.to_string(),
            processed,
            jobs,
        }
    }

    pub async fn handle(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> Result<Value, (StatusCode, String)> {
        if !self.signing_secret.is_empty() {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string()
            };
            let timestamp = header(TIMESTAMP_HEADER);
            let signature = header(SIGNATURE_HEADER);
            if !verify_signature(&self.signing_secret, &timestamp, body, &signature, now) {
                warn!("Rejected Slack request with invalid signature");
                return Err((StatusCode::UNAUTHORIZED, "Invalid Slack signature".to_string()));
            }
        }

        let data: Value = serde_json::from_slice(body)
            .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid JSON".to_string()))?;

        match data.get("type").and_then(Value::as_str) {
            Some("url_verification") => {
                let challenge = data.get("challenge").cloned().unwrap_or(json!(""));
                Ok(json!({ "challenge": challenge }))
            }
            Some("event_callback") => Ok(self.handle_event(&data).await),
            _ => Ok(json!({ "ok": true })),
        }
    }

    async fn handle_event(&self, data: &Value) -> Value {
        let event_id = str_field(data, "event_id");
        if self.processed.check_and_insert(event_id).await {
            debug!("Duplicate Slack event {}", event_id);
            return json!({ "ok": true, "duplicate": true });
        }

        let empty = json!({});
        let event = data.get("event").unwrap_or(&empty);
        let event_type = str_field(event, "type");
        if event_type != "app_mention" && event_type != "message" {
            return json!({ "ok": true });
        }
        if event.get("bot_id").is_some_and(|v| !v.is_null())
            || str_field(event, "subtype") == "bot_message"
        {
            return json!({ "ok": true, "skipped": "bot_message" });
        }

        let text = str_field(event, "text").trim();
        let title = if text.is_empty() {
            "Slack Job".to_string()
        } else {
            format!("Slack: {}", text.chars().take(TITLE_TEXT_LIMIT).collect::<String>())
        };
        let channel = str_field(event, "channel");
        let thread_ts = match str_field(event, "thread_ts") {
            "" => str_field(event, "ts"),
            ts => ts,
        };
        let user = match str_field(event, "user") {
            "" => "unknown",
            u => u,
        };

        let payload = json!({
            "source": "slack",
            "event_type": event_type,
            "user": user,
            "channel": channel,
            "thread_ts": thread_ts,
            "text": text,
            "event_id": event_id,
        });
        let job = self.jobs.create(&title, Some(payload), "slack").await;

        // Reply delivery is not wired up; the reply is only logged
        info!(
            "Slack job {} created from {} in {} (reply: status {})",
            job.id, user, channel, job.status
        );

        json!({ "ok": true, "job_id": job.id })
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}
