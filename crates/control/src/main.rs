//! ADC Logger - Main Entry Point

use anyhow::Context;
use control::{init_logging, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== ADC Logger v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting acquisition and command service...");

    let settings = Settings::new(None).context("failed to load settings")?;
    control::run(settings).await
}
