// src/main.rs

//! # Veranda Main Entry Point
//!
//! This is the main entry point for the Veranda server. It initializes
//! configuration and logging, then launches the core async tasks: the site
//! server (static files plus the configuration save endpoint) and the
//! collaboration relay.
//!
//! ## Modules
//!
//! - [`config`]: Handles configuration loading and merging from CLI, file, and environment.
//! - [`relay`]: Maintains the peer registry and relays collaboration messages.
//! - [`store`]: Persists the site configuration file.
//! - [`web`]: Serves static files and the save endpoint.

mod config;
mod relay;
mod store;
mod web;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::AppConfig;

/// The main entry point for the Veranda server.
///
/// This function performs the following steps:
/// 1. Loads the application configuration from CLI, file, and environment.
/// 2. Initializes the tracing subscriber for logging.
/// 3. Spawns the site server and collaboration relay tasks.
/// 4. Waits for a Ctrl-C signal to initiate graceful shutdown of all tasks.
///
/// # Returns
/// Returns `Ok(())` if the application exits cleanly, or an error if initialization fails.
#[tokio::main]
async fn main() -> Result<()> {
    let app_config = match AppConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing subscriber for logging with environment filter and max level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app_config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(std::io::stderr) // Log to stderr
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default tracing subscriber failed");

    tracing::info!("Veranda starting with configuration: {:?}", app_config);

    // Shutdown signal channel for graceful shutdown of all tasks.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks = Vec::new();

    // Collaboration relay task.
    let relay = Arc::new(relay::Relay::new());
    let relay_config = Arc::clone(&app_config);
    let relay_shutdown_rx = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = relay::start_relay_server(relay_config, relay, relay_shutdown_rx).await {
            tracing::error!("Collaboration relay exited with error: {}", e);
        }
    }));

    // Site server task.
    tracing::info!(
        "Serving project root {:?} on {}",
        app_config.root_dir,
        app_config.http_addr
    );
    let state = web::AppState::new(Arc::clone(&app_config));
    let web_shutdown_rx = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = web::start_server(state, web_shutdown_rx).await {
            tracing::error!("Site server exited with error: {}", e);
        }
    }));

    // Wait for Ctrl-C signal to initiate shutdown.
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Ctrl-C received, initiating shutdown...");
        }
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl-C signal: {}", err);
        }
    }

    // Signal all tasks to shutdown.
    if shutdown_tx.send(true).is_err() {
        tracing::error!("Failed to send shutdown signal");
    }

    // Wait for all tasks to complete.
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("A task panicked or exited with error: {}", e);
        }
    }

    tracing::info!("Veranda shut down gracefully.");
    Ok(())
}
