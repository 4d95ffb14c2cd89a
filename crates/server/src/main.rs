use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filemill_core::{
    load_config, validate_config, ConversionOrchestrator, Converter, ExternalToolConverter,
    LogFormat, ToolAvailability,
};
use filemill_server::api::{create_router, WsBroadcaster};
use filemill_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("FILEMILL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration (logging format comes from it)
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_logging(config.logging.format);
    info!("filemill {} starting", VERSION);
    info!("Configuration loaded from {:?}", config_path);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Cache directory: {:?}", config.cache.directory);
    info!("Work directory: {:?}", config.converter.work_dir);

    // Probe external tools; missing ones only disable their routes
    let tools = ToolAvailability::detect(&config.converter).await;
    for status in &tools.tools {
        if status.available {
            info!(
                tool = status.tool.name(),
                path = %status.path.display(),
                version = status.version.as_deref().unwrap_or("unknown"),
                "Tool available"
            );
        } else {
            warn!(
                tool = status.tool.name(),
                path = %status.path.display(),
                "Tool not found, its conversions will fail"
            );
        }
    }

    let converter = ExternalToolConverter::new(config.converter.clone());
    if let Err(e) = converter.validate().await {
        warn!("Converter validation failed: {}", e);
    }
    let converter: Arc<dyn Converter> = Arc::new(converter);

    // Create orchestrator (opens and reconciles the cache)
    let orchestrator = Arc::new(
        ConversionOrchestrator::new(&config, converter)
            .await
            .context("Failed to initialize conversion orchestrator")?,
    );

    let purged = orchestrator.purge_expired_cache().await;
    if purged > 0 {
        info!("Purged {} expired cache entries", purged);
    }

    // Create WebSocket broadcaster for real-time task updates
    let ws_broadcaster = WsBroadcaster::default();
    info!("WebSocket broadcaster initialized");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        tools,
        ws_broadcaster,
    ));

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

    let stats = orchestrator.processor_stats().await;
    if stats.pending + stats.processing > 0 {
        warn!(
            pending = stats.pending,
            processing = stats.processing,
            "Shutting down with unfinished tasks"
        );
    }
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
