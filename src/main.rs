// src/main.rs - Relay entry point
use clap::Parser;
use print_relay::config::{self, Config};
use print_relay::print_job::{JobRegistry, PrintJobController};
use print_relay::printer_client::HttpPrinterClient;
use print_relay::storage::ImageStore;
use print_relay::web::api::{self, AppState, AppStateInner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Headroom on top of the HTTP client timeout before a print is declared
/// timed out by the controller.
const PRINT_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "print-relay", version, about = "Upload images from a phone and print them")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g. 0.0.0.0:3000)
    #[arg(long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    tracing::info!("Starting print relay");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", cli.config.display());

    let mut config = config::load_config_or_default(&cli.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config.display(), e);
        tracing::error!("Please ensure the configuration file is properly formatted");
        e
    })?;
    config.apply_env_overrides();
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    tracing::info!("Printer API: {} (endpoints {:?})", config.printer.api_host, config.printer.endpoints);
    tracing::info!("Printer timeout: {}s", config.printer.timeout_secs);
    tracing::info!("Max upload: {} bytes", config.storage.max_upload_bytes);

    let state = build_state(&config).await?;

    // Periodically drop finished jobs so the registry does not grow without bound.
    let sweeper = {
        let state = state.clone();
        let interval = config.registry.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                state.controller.sweep().await;
            }
        })
    };

    let app = api::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!(
        "Shut down with {} job(s) in the registry",
        state.controller.registry().len().await
    );
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let storage = ImageStore::open(&config.storage).await?;
    let registry = JobRegistry::new(config.registry.max_jobs);
    let printer = HttpPrinterClient::new(&config.printer)?;
    let controller = PrintJobController::new(
        storage,
        registry,
        Arc::new(printer),
        config.printer.timeout() + PRINT_TIMEOUT_GRACE,
        config.registry.retention(),
    );
    Ok(AppStateInner::new(controller))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
