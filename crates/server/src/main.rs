use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderflow_core::{
    load_config, load_config_from_env, OrderStore, SlaScheduler, SqliteOrderStore, TickProcessor,
};

use orderflow_server::api::create_router;
use orderflow_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
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

    info!("orderflow {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("ORDERFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; a missing file is fine, environment variables and
    // defaults cover everything.
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!(
            "No config file at {:?}, using environment and defaults",
            config_path
        );
        load_config_from_env().context("Failed to load config from environment")?
    };

    info!("Database path: {:?}", config.database.path);

    // Create order store
    let store: Arc<dyn OrderStore> = Arc::new(
        SqliteOrderStore::new(&config.database.path).context("Failed to open order store")?,
    );

    // Create SLA scheduler
    let processor = Arc::new(TickProcessor::new(Arc::clone(&store), config.timer.clone()));
    let scheduler = Arc::new(SlaScheduler::new(processor));

    if config.timer.enabled {
        scheduler.start().await;
        info!(
            interval_secs = config.timer.tick_interval_secs,
            threshold_secs = config.timer.sla_threshold_secs,
            "SLA timer started"
        );
    } else {
        info!("SLA timer disabled by configuration");
    }

    // Create app state and router
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, Arc::clone(&scheduler)));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let an in-flight tick finish before exiting
    info!("Server shutting down...");
    scheduler.stop().await;
    info!("SLA timer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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
