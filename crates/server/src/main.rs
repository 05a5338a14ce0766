use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediathek_core::{
    load_config, validate_config, CatalogSource, CatalogStore, CatalogSync, HttpCatalogSource,
    LazyIndexView, SqliteCatalogStore, SqliteSyncStateStore, SyncStateStore,
};
use mediathek_server::{
    api::{create_router, WsBroadcaster},
    metrics::CATALOG_SHOWS,
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("MEDIATHEK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalogStore::new(&config.database.path).context("Failed to open catalog")?,
    );
    let sync_state: Arc<dyn SyncStateStore> = Arc::new(
        SqliteSyncStateStore::new(&config.database.path)
            .context("Failed to open sync state store")?,
    );
    let stats = catalog.stats().context("Failed to read catalog stats")?;
    CATALOG_SHOWS.set(stats.total_shows as i64);
    info!(
        shows = stats.total_shows,
        generation = stats.generation,
        "Catalog opened"
    );

    let source: Arc<dyn CatalogSource> = Arc::new(
        HttpCatalogSource::new(&config.sync).context("Failed to create HTTP client")?,
    );
    let sync = Arc::new(CatalogSync::new(
        config.sync.clone(),
        source,
        Arc::clone(&catalog),
        sync_state,
    ));

    let view = LazyIndexView::new(Arc::clone(&catalog), &config.view)
        .context("Failed to build catalog view")?;

    let state = Arc::new(AppState::new(
        config.clone(),
        catalog,
        Arc::clone(&sync),
        view,
        WsBroadcaster::default(),
    ));
    let relay_handles = state.start_event_relay().await;

    if config.sync.enabled {
        sync.start();
        info!(
            "Catalog sync started (checking every {}s)",
            config.sync.check_interval_secs
        );
    } else {
        info!("Periodic catalog sync disabled in config");
    }

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sync.stop().await;
    for handle in relay_handles {
        handle.abort();
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
