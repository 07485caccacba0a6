//! Map Poster Backend Server
//!
//! Entry point for the maptoposter-backend server: configuration loading,
//! artifact store and cleanup scheduler setup, and HTTP server startup.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use maptoposter_artifacts::CleanupScheduler;
use maptoposter_job_queue::JobQueueClient;
use maptoposter_render::{DirectoryThemes, PosterPipeline, ThemeProvider, Typeface};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use maptoposter_backend::app::{build_router_with_options, RouterOptions};
use maptoposter_backend::state::AppState;

mod cli;
mod config_helpers;
mod tracing_setup;

use cli::CliArgs;
use config_helpers::{
    artifact_store_from_config, cors_layer_from_config, network_settings_from_config,
    parse_bind_address, static_dir_from_config,
};
use tracing_setup::install_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eprintln!("[STARTUP] Map Poster Backend starting...");
    let args = CliArgs::parse();

    eprintln!("[STARTUP] Loading config from: {:?}", args.config_path);
    let mut config = load_config(args.config_path.as_deref())?;
    args.apply(&mut config);
    maptoposter_config::validate_config(&config)?;
    eprintln!("[STARTUP] Config loaded successfully");

    eprintln!("[STARTUP] Initializing tracing...");
    install_tracing_from_config(&config.logging);
    eprintln!("[STARTUP] Tracing initialized");

    eprintln!("[STARTUP] Preparing artifact directory...");
    let store = artifact_store_from_config(&config.artifacts)?;
    let ttl = Duration::from_secs(config.artifacts.ttl_minutes.saturating_mul(60));
    tracing::info!(
        artifact_dir = %store.root().display(),
        ttl_minutes = config.artifacts.ttl_minutes,
        themes_dir = %config.themes.directory,
        "artifact and theme configuration"
    );

    eprintln!("[STARTUP] Initializing services...");
    let themes: Arc<dyn ThemeProvider> = Arc::new(DirectoryThemes::new(&config.themes.directory));
    let pipeline = PosterPipeline::with_network(
        Arc::clone(&themes),
        store.clone(),
        &network_settings_from_config(&config.render),
    )?
    .with_max_pixels(config.render.max_pixels)
    .with_typeface(Typeface::discover(config.render.font_path.as_deref().map(Path::new))?);
    let jobs = JobQueueClient::new(Arc::new(pipeline));

    let scheduler = CleanupScheduler::new(store.clone(), ttl)
        .with_interval(Duration::from_secs(config.artifacts.sweep_interval_secs));
    let cleanup = scheduler.trigger();
    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));
    eprintln!("[STARTUP] Cleanup scheduler started");

    let state = Arc::new(AppState::new(jobs, store.clone(), themes, cleanup));

    eprintln!("[STARTUP] Building application router...");
    let options = RouterOptions {
        static_dir: static_dir_from_config(&config.frontend),
        cors: cors_layer_from_config(&config.cors),
    };
    let app = build_router_with_options(state, options);
    eprintln!("[STARTUP] Router built successfully");

    let addr = parse_bind_address(&config.server.host, config.server.port);
    eprintln!("[STARTUP] Binding to {addr}");
    let listener = TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] ✓ Server listening on {addr}");
    eprintln!("[STARTUP] ✓ Ready to accept connections!");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    shutdown.cancel();
    if let Err(e) = scheduler_task.await {
        tracing::warn!(error = %e, "cleanup scheduler did not stop cleanly");
    }

    if config.artifacts.remove_on_shutdown {
        match store.remove_all() {
            Ok(()) => tracing::info!(path = %store.root().display(), "artifact directory removed"),
            Err(e) => tracing::warn!(error = %e, "failed to remove artifact directory"),
        }
    }

    Ok(())
}

/// Load configuration from file or defaults.
fn load_config(path: Option<&str>) -> anyhow::Result<maptoposter_config::Config> {
    maptoposter_config::load_config(path).map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        anyhow::anyhow!(e.to_string())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
