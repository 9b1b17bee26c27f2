//! specview-web - Audio spectrogram web service
//!
//! Accepts wav/mp3 uploads, renders their power spectrogram to PNG and serves
//! the result back. Default address: http://127.0.0.1:5000

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use specview_common::config::ServiceConfig;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use specview_web::AppState;

/// Command-line arguments for specview-web
#[derive(Parser, Debug)]
#[command(name = "specview-web")]
#[command(about = "Audio spectrogram web service")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "SPECVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "SPECVIEW_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(short, long, env = "SPECVIEW_BIND")]
    bind: Option<String>,

    /// Directory holding the uploads/ and results/ folders
    #[arg(short, long, env = "SPECVIEW_STATIC_ROOT")]
    static_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_path) =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(static_root) = args.static_root {
        config.static_root = static_root;
    }

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "specview_web={level},specview_common={level},tower_http=debug",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting specview-web v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    let state = AppState::new(config);
    state
        .storage
        .ensure_exists()
        .context("Failed to create storage directories")?;
    info!("Uploads: {}", state.storage.uploads.root().display());
    info!("Results: {}", state.storage.results.root().display());

    let addr = state.config.listen_address();
    let app = specview_web::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
