//! hybridopsd - HybridOps supervisor API

use anyhow::Result;
use hybridops_common::config::SupervisorConfig;
use hybridops_common::logging;
use hybridopsd::server;
use hybridopsd::supervisor::HttpToolGateClient;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    info!("hybridopsd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = SupervisorConfig::load();
    if config.toolgate.shared_secret.is_empty() {
        warn!("MCP_SHARED_SECRET is empty; the tool gate will refuse every call");
    }
    if config.auth.admin_email.is_empty() || config.auth.admin_password_hash.is_empty() {
        warn!("ADMIN_EMAIL/ADMIN_PASSWORD_HASH not set; login is disabled");
    }

    let gate = HttpToolGateClient::new(&config.toolgate)?;
    server::run(config, Arc::new(gate)).await
}
