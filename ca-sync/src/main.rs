//! ca-sync - ConfirmAula studio sync service
//!
//! Loads and merges the local cache with the remote store, keeps both in
//! step, imports lessons from Emusys and serves the HTTP API.

use anyhow::{Context, Result};
use ca_common::config::{load_or_default, RootFolderInitializer, RootFolderResolver};
use ca_common::db::init_remote_store;
use ca_common::events::EventBus;
use ca_sync::stores::{EmusysClient, JsonFileCache, SqlRemoteStore};
use ca_sync::{build_router, AppState, SyncOrchestrator};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ca-sync")]
#[command(about = "ConfirmAula scheduling and confirmation sync service")]
#[command(version)]
struct Args {
    /// Root folder holding the local cache (overrides CA_ROOT_FOLDER and the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref());

    let default_directive = config
        .logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive.into()),
        )
        .init();

    info!(
        "Starting ConfirmAula sync (ca-sync) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("ca-sync")
        .with_cli_arg(args.root_folder)
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root().display());

    let database_url = config
        .remote_database_url
        .clone()
        .unwrap_or_else(|| initializer.remote_database_url());
    let pool = init_remote_store(&database_url)
        .await
        .with_context(|| format!("Failed to open remote store at {database_url}"))?;

    let lessons = EmusysClient::from_config(&config.emusys).context("Failed to build Emusys client")?;
    if !lessons.has_token() {
        warn!("No Emusys token configured; lesson sync will return no lessons");
    }

    let event_bus = EventBus::new(100);
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::new(JsonFileCache::new(initializer.cache_dir())),
        Arc::new(SqlRemoteStore::new(pool)),
        Arc::new(lessons),
        event_bus,
        config.sync.clone(),
    ));

    // A failed load keeps serving so the reset endpoint stays reachable
    if let Err(e) = orchestrator.initial_load().await {
        error!("Initial load failed: {}", e);
    }
    let background = orchestrator.spawn_background_tasks();

    let app = build_router(AppState::new(Arc::clone(&orchestrator)));
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("ca-sync listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let shutdown = orchestrator.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    if let Err(e) = orchestrator.flush().await {
        warn!("Final remote push failed: {}", e);
    }
    orchestrator.shutdown().await;
    for task in background {
        let _ = task.await;
    }

    info!("ca-sync stopped");
    Ok(())
}
