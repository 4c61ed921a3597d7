//! Motor Diagnostics - Main Entry Point

use anyhow::Result;
use motor_service::{init_logging, init_metrics, run, ServiceSettings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let settings = ServiceSettings::load(path.as_deref())?;
    init_logging(&settings.logging)?;

    info!("=== Motor Diagnostics v{} ===", env!("CARGO_PKG_VERSION"));

    if settings.metrics.enabled {
        init_metrics(&settings.metrics)?;
    }

    run(settings).await?;
    Ok(())
}
