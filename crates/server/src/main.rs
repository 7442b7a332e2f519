use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsreel_core::{
    load_config, validate_config, Gateway, HttpGateway, QuotaGateway, RunOrchestrator,
};
use newsreel_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("NEWSREEL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "newsreel {} configuration loaded (hash {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Output directory: {:?}", config.output.root);

    for (name, key) in [
        ("news", &config.services.news.api_key),
        ("script", &config.services.script.api_key),
        ("speech", &config.services.speech.api_key),
        ("images", &config.services.images.api_key),
        ("avatar", &config.services.avatar.api_key),
    ] {
        if key.is_empty() {
            warn!("No API key configured for {} service", name);
        }
    }

    tokio::fs::create_dir_all(&config.output.root)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", config.output.root))?;

    // External services, metered by the daily quotas
    let http = HttpGateway::from_config(&config.services)
        .context("Failed to create service clients")?;
    let gateway = QuotaGateway::new(http, config.quotas.clone());
    let usage = gateway.tracker();
    let gateway: Arc<dyn Gateway> = Arc::new(gateway);

    let orchestrator = RunOrchestrator::from_config(gateway, &config);
    info!(
        "Run orchestrator ready (poll every {} ms, up to {} attempts)",
        config.poller.interval_ms, config.poller.max_attempts
    );

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), orchestrator.clone(), usage));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if orchestrator.request_cancel() {
        info!("Cancelled the run in progress");
    }
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
