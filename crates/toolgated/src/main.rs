//! toolgated - tool-execution service for HybridOps

use anyhow::Result;
use hybridops_common::config::ToolGateConfig;
use hybridops_common::logging;
use std::sync::Arc;
use toolgated::{server, HttpApiBackend};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    info!("toolgated v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ToolGateConfig::load();
    let backend = HttpApiBackend::new(
        &config.api_base_url,
        &config.api_token,
        config.api_timeout(),
    )?;

    server::run(config, Arc::new(backend)).await
}
