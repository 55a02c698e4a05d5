//! Service configuration
//!
//! Both services read a TOML file (missing or unreadable -> defaults) and
//! then apply environment overrides for secrets and URLs, so the same binary
//! runs from a config file or a container environment.
//!
//! Config lives in /etc/hybridops/{hybridopsd,toolgated}.toml unless
//! HYBRIDOPS_CONFIG / TOOLGATE_CONFIG point elsewhere.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// System configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/hybridops";
const SUPERVISOR_CONFIG_FILE: &str = "hybridopsd.toml";
const TOOLGATE_CONFIG_FILE: &str = "toolgated.toml";

/// Session tokens stay valid for a week
pub const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ============================================================================
// Supervisor (hybridopsd)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_supervisor_bind")]
    pub bind: String,

    #[serde(default)]
    pub toolgate: ToolGateClientSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub supervisor: SupervisorSettings,

    #[serde(default)]
    pub jobs: JobsSettings,

    #[serde(default)]
    pub slack: SlackSettings,
}

/// How the supervisor reaches the tool gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolGateClientSettings {
    #[serde(default = "default_toolgate_url")]
    pub base_url: String,

    #[serde(default)]
    pub shared_secret: String,

    /// Budget for one /run round trip
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Budget for /tools listing
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub admin_email: String,

    /// Hex SHA-256 of the admin password
    #[serde(default)]
    pub admin_password_hash: String,

    #[serde(default = "default_session_secret")]
    pub session_secret: String,

    #[serde(default = "default_session_max_age")]
    pub session_max_age_secs: u64,

    #[serde(default = "default_login_attempts")]
    pub login_attempts: usize,

    #[serde(default = "default_login_window")]
    pub login_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Confirm-before-act for READ tools too. Keep on.
    #[serde(default = "default_true")]
    pub require_2step_for_read: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsSettings {
    /// Exposes /jobs/:id/set-needs-approval
    #[serde(default)]
    pub enable_test_endpoints: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSettings {
    /// Empty disables signature verification (local development)
    #[serde(default)]
    pub signing_secret: String,

    #[serde(default = "default_max_processed_events")]
    pub max_processed_events: usize,
}

fn default_supervisor_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_toolgate_url() -> String {
    "http://mcp:3333".to_string()
}

fn default_run_timeout() -> u64 {
    30
}

fn default_list_timeout() -> u64 {
    10
}

fn default_session_secret() -> String {
    "dev-secret".to_string()
}

fn default_session_max_age() -> u64 {
    SESSION_MAX_AGE_SECS
}

fn default_login_attempts() -> usize {
    10
}

fn default_login_window() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_max_processed_events() -> usize {
    1000
}

impl Default for ToolGateClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_toolgate_url(),
            shared_secret: String::new(),
            run_timeout_secs: default_run_timeout(),
            list_timeout_secs: default_list_timeout(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            admin_password_hash: String::new(),
            session_secret: default_session_secret(),
            session_max_age_secs: default_session_max_age(),
            login_attempts: default_login_attempts(),
            login_window_secs: default_login_window(),
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            require_2step_for_read: true,
        }
    }
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            max_processed_events: default_max_processed_events(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            bind: default_supervisor_bind(),
            toolgate: ToolGateClientSettings::default(),
            auth: AuthSettings::default(),
            supervisor: SupervisorSettings::default(),
            jobs: JobsSettings::default(),
            slack: SlackSettings::default(),
        }
    }
}

impl ToolGateClientSettings {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

impl SupervisorConfig {
    /// File (if any) plus process environment
    pub fn load() -> Self {
        let path = std::env::var("HYBRIDOPS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| supervisor_config_path());
        let mut config = load_or_default::<Self>(&path);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).map(|v| v.trim().to_string());

        if let Some(v) = get("HYBRIDOPSD_BIND").filter(|v| !v.is_empty()) {
            self.bind = v;
        }
        if let Some(v) = get("MCP_BASE_URL").filter(|v| !v.is_empty()) {
            self.toolgate.base_url = v;
        }
        if let Some(v) = get("MCP_SHARED_SECRET") {
            self.toolgate.shared_secret = v;
        }
        if let Some(v) = get("ADMIN_EMAIL") {
            self.auth.admin_email = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD_HASH") {
            self.auth.admin_password_hash = v;
        }
        if let Some(v) = get("JWT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.session_secret = v;
        }
        if let Some(v) = get("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = v;
        }
        if let Some(v) = get("ENABLE_TEST_ENDPOINTS") {
            self.jobs.enable_test_endpoints = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("REQUIRE_2STEP_FOR_READ") {
            self.supervisor.require_2step_for_read = v.eq_ignore_ascii_case("true");
        }
    }
}

// ============================================================================
// Tool gate (toolgated)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolGateConfig {
    #[serde(default = "default_toolgate_bind")]
    pub bind: String,

    /// Expected in the shared-secret header on /run and /tools
    #[serde(default)]
    pub shared_secret: String,

    /// Supervisor API the tools act on
    #[serde(default = "default_api_url")]
    pub api_base_url: String,

    /// Bearer token presented to the supervisor API
    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_confirm_ttl")]
    pub confirm_ttl_secs: u64,
}

fn default_toolgate_bind() -> String {
    "0.0.0.0:3333".to_string()
}

fn default_api_url() -> String {
    "http://api:8000".to_string()
}

fn default_api_timeout() -> u64 {
    10
}

fn default_confirm_ttl() -> u64 {
    300
}

impl Default for ToolGateConfig {
    fn default() -> Self {
        Self {
            bind: default_toolgate_bind(),
            shared_secret: String::new(),
            api_base_url: default_api_url(),
            api_token: String::new(),
            api_timeout_secs: default_api_timeout(),
            confirm_ttl_secs: default_confirm_ttl(),
        }
    }
}

impl ToolGateConfig {
    pub fn load() -> Self {
        let path = std::env::var("TOOLGATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| toolgate_config_path());
        let mut config = load_or_default::<Self>(&path);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }

    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).map(|v| v.trim().to_string());

        if let Some(v) = get("TOOLGATED_BIND").filter(|v| !v.is_empty()) {
            self.bind = v;
        }
        if let Some(v) = get("MCP_SHARED_SECRET") {
            self.shared_secret = v;
        }
        if let Some(v) = get("API_BASE_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = v;
        }
        if let Some(v) = get("MCP_ADMIN_TOKEN") {
            self.api_token = v;
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn confirm_ttl(&self) -> Duration {
        Duration::from_secs(self.confirm_ttl_secs)
    }
}

// ============================================================================
// Paths and loading
// ============================================================================

pub fn supervisor_config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG_DIR).join(SUPERVISOR_CONFIG_FILE)
}

pub fn toolgate_config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG_DIR).join(TOOLGATE_CONFIG_FILE)
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match read_toml(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            T::default()
        }
    }
}
