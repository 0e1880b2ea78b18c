/// Simple Skins - skin restoration service
///
/// Starts the resolution pipeline, loads the default skins and keeps the
/// background cache sweep and worker pool running until interrupted.

use anyhow::Context;
use simple_skins::{config::SkinsConfig, AppContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SkinsConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(config.logging.json);

    tracing::info!("Loading SimpleSkins v{}", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("Failed to start skin service")?;

    tracing::info!("SimpleSkins enabled, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    ctx.shutdown().await;

    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "simple_skins=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
