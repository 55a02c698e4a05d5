//! Request middleware: body limits, login rate limiting, operator auth

use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Maximum body size: 64 KiB
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Sliding-window limiter keyed by an arbitrary string (login email)
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Record an attempt for `key`; false once the window is full
    pub async fn check(&self, key: &str) -> bool {
        let mut requests = self.requests.write().await;
        let attempts = requests.entry(key.to_string()).or_default();

        let now = Instant::now();
        attempts.retain(|&ts| now.duration_since(ts) < self.window);

        if attempts.len() >= self.limit {
            warn!(
                "Rate limit exceeded for {} ({}/{})",
                key,
                attempts.len(),
                self.limit
            );
            return false;
        }

        attempts.push(now);
        true
    }

    /// Drop keys with no attempts inside the window
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, attempts| {
            attempts.retain(|&ts| now.duration_since(ts) < self.window);
            !attempts.is_empty()
        });
        debug!("Rate limiter cleanup: {} active keys", requests.len());
    }

    pub async fn tracked_keys(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Body size limit middleware
///
/// Checks Content-Length header and rejects requests exceeding MAX_BODY_SIZE
pub async fn body_size_limit(request: Request, next: Next) -> Result<Response, StatusCode> {
    let declared = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > MAX_BODY_SIZE {
            warn!(
                "Request body too large: {} bytes (max: {})",
                length, MAX_BODY_SIZE
            );
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}

/// Operator authentication; the identity is stored as a request extension
pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.operator_auth.authenticate(request.headers()) {
        Ok(operator) => {
            debug!("Operator {} on {}", operator.email, request.uri().path());
            request.extensions_mut().insert(operator);
            next.run(request).await
        }
        Err(e) => {
            warn!("Auth failed on {}: {}", request.uri().path(), e);
            e.into_response()
        }
    }
}
