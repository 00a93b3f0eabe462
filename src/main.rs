//! alertrelay - Alertmanager to SMS relay
//!
//! Receives Alertmanager webhooks and forwards a rendered text message to a
//! list of phone numbers through the Twilio Messages API.

use alertrelay::{app::App, cli::Cli, config::Config};
use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Initialize a default subscriber just for this error.
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("alertrelay starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("Provider Endpoint: {}", config.provider.messages_url());
    info!("Sender: {}", config.provider.sender);
    info!("Provider Timeout: {}ms", config.provider.timeout_ms);
    info!("Wait For Delivery: {}", config.delivery.wait_for_delivery);
    info!(
        "Shutdown Grace Period: {}s",
        config.delivery.shutdown_grace_seconds
    );
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            config.metrics.listen_address.to_string()
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received. Shutting down gracefully..."),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    app.run().await
}
