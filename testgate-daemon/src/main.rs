use anyhow::Result;

use testgate_core::config::ServiceConfig;
use testgate_daemon::{logging, service};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration comes from TESTGATE_CONFIG and environment overrides only
    let config = ServiceConfig::from_env()
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "testgate-daemon starting");

    service::run(config).await?;

    tracing::info!("testgate-daemon shut down");
    Ok(())
}
