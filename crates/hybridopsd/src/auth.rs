//! Operator authentication
//!
//! `OperatorAuth` is the seam every protected route goes through. The
//! reference `SessionAuth` issues `mvp.<unix_ts>.<hex hmac>` bearer tokens to
//! the single configured admin after a password check.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use hybridops_common::config::AuthSettings;
use hybridops_common::protocol::{LoginResponse, Operator};
use hybridops_common::secret::constant_time_eq;
use serde_json::json;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "mvp";
const ADMIN_ID: &str = "admin-1";
const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Admin not configured (ADMIN_EMAIL/ADMIN_PASSWORD_HASH)")]
    NotConfigured,

    #[error("Too many attempts, try later")]
    RateLimited,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Given request headers, yield the operator or reject
pub trait OperatorAuth: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Operator, AuthError>;
}

/// Bearer credential from an Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Single-admin session tokens signed with HMAC-SHA256
pub struct SessionAuth {
    admin_email: String,
    admin_password_hash: String,
    secret: String,
    max_age_secs: u64,
}

impl SessionAuth {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            admin_email: settings.admin_email.trim().to_string(),
            admin_password_hash: settings.admin_password_hash.trim().to_lowercase(),
            secret: settings.session_secret.clone(),
            max_age_secs: settings.session_max_age_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.admin_email.is_empty() && !self.admin_password_hash.is_empty()
    }

    fn operator(&self) -> Operator {
        Operator {
            id: ADMIN_ID.to_string(),
            email: self.admin_email.clone(),
            role: ADMIN_ROLE.to_string(),
        }
    }

    fn signature(&self, ts: &str) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(format!("{}|{}", self.admin_email, ts).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Token for the admin, stamped with `now` (unix seconds)
    pub fn issue_token(&self, now: i64) -> String {
        let ts = now.to_string();
        format!("{}.{}.{}", TOKEN_PREFIX, ts, self.signature(&ts))
    }

    /// Signature and age check against `now` (unix seconds)
    pub fn token_valid(&self, token: &str, now: i64) -> bool {
        let mut parts = token.splitn(3, '.');
        let (Some(prefix), Some(ts), Some(sig)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        if prefix != TOKEN_PREFIX {
            return false;
        }
        let Ok(issued) = ts.parse::<i64>() else {
            return false;
        };
        if now.saturating_sub(issued) > self.max_age_secs as i64 {
            return false;
        }
        constant_time_eq(self.signature(ts).as_bytes(), sig.as_bytes())
    }

    /// Check credentials and mint a session. Rate limiting is the caller's job.
    pub fn login(&self, email: &str, password: &str, now: i64) -> Result<LoginResponse, AuthError> {
        if !self.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        if !email.trim().eq_ignore_ascii_case(&self.admin_email) {
            return Err(AuthError::InvalidCredentials);
        }
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        if !constant_time_eq(digest.as_bytes(), self.admin_password_hash.as_bytes()) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(LoginResponse {
            token: self.issue_token(now),
            user: self.operator(),
        })
    }
}

impl OperatorAuth for SessionAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Operator, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        if !self.token_valid(token, chrono::Utc::now().timestamp()) {
            return Err(AuthError::InvalidToken);
        }
        Ok(self.operator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn settings() -> AuthSettings {
        AuthSettings {
            admin_email: "ops@example.com".to_string(),
            admin_password_hash: hex::encode(Sha256::digest(b"hunter2")),
            session_secret: "test-secret".to_string(),
            ..AuthSettings::default()
        }
    }

    #[test]
    fn test_login_and_token_roundtrip() {
        let auth = SessionAuth::new(&settings());
        let resp = auth.login("OPS@example.com", "hunter2", 1_700_000_000).unwrap();
        assert!(resp.token.starts_with("mvp.1700000000."));
        assert_eq!(resp.user.role, "admin");
        assert!(auth.token_valid(&resp.token, 1_700_000_100));
    }

    #[test]
    fn test_wrong_password_and_email() {
        let auth = SessionAuth::new(&settings());
        assert_eq!(
            auth.login("ops@example.com", "wrong", 0).unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.login("other@example.com", "hunter2", 0).unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_unconfigured_admin() {
        let auth = SessionAuth::new(&AuthSettings::default());
        let err = auth.login("a@b.c", "x", 0).unwrap_err();
        assert_eq!(err, AuthError::NotConfigured);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_token_expires_after_max_age() {
        let auth = SessionAuth::new(&settings());
        let token = auth.issue_token(1_000);
        let week = 7 * 24 * 3600;
        assert!(auth.token_valid(&token, 1_000 + week));
        assert!(!auth.token_valid(&token, 1_000 + week + 1));
    }

    #[test]
    fn test_tampered_tokens_fail() {
        let auth = SessionAuth::new(&settings());
        let token = auth.issue_token(1_000);
        assert!(!auth.token_valid(&token.replacen("mvp", "jwt", 1), 1_000));
        assert!(!auth.token_valid(&token.replacen("1000", "1001", 1), 1_001));
        assert!(!auth.token_valid("mvp.notanumber.abc", 1_000));
        assert!(!auth.token_valid("garbage", 1_000));
    }

    #[test]
    fn test_authenticate_headers() {
        let auth = SessionAuth::new(&settings());
        let mut headers = HeaderMap::new();
        assert_eq!(auth.authenticate(&headers).unwrap_err(), AuthError::MissingToken);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert_eq!(auth.authenticate(&headers).unwrap_err(), AuthError::InvalidToken);

        let token = auth.issue_token(chrono::Utc::now().timestamp());
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(auth.authenticate(&headers).unwrap().email, "ops@example.com");
    }
}
