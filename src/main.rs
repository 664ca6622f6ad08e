use anyhow::Result;
use graveyard_watch::core::{logging, Config};
use graveyard_watch::monitoring::GraveyardTracker;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Config problems are fatal before anything is polled.
    let config_path = Config::path_from_args(std::env::args());
    let config = Config::read(&config_path)?;

    logging::init_logging(&config.log_level);
    config.validate()?;

    tracing::info!("🚀 Graveyard watch starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Config: {}", config_path);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Dropping the sender would stop the tracker; keep polling instead.
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested, finishing current player...");
        let _ = shutdown_tx.send(true);
    });

    let mut tracker = GraveyardTracker::from_config(&config);
    tracker.run(shutdown_rx).await;

    Ok(())
}
