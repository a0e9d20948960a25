//! BLE Uplink Bridge - Main Entry Point

use anyhow::Context;
use bridge::{init_logging, run, BridgeConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = BridgeConfig::load(config_path.as_deref()).context("loading configuration")?;

    init_logging(&config.log_level, config.log_json);

    info!("=== BLE Uplink Bridge v{} ===", env!("CARGO_PKG_VERSION"));

    run(config).await.context("bridge stopped")?;
    Ok(())
}
