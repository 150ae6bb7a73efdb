//! test-server - version 0.1.0
//!
//! Minimal Prometheus test server with tracing logging.
//! This is the main entry point that resolves configuration, starts the
//! system sampler and serves the HTTP endpoints until shutdown.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, Level};

use test_server::cli::{Args, LogLevel};
use test_server::config::{resolve_config, show_config, validate_effective_config, Config};
use test_server::{router, sampler, AppState, ProcSource, Sampler, SamplerSettings};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let max_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(max_level) = max_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Loads and validates configuration, exiting with code 1 if it is invalid.
fn load_validated_config(args: &Args) -> Config {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    config
}

/// Resolves on SIGINT or SIGTERM.
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
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_validated_config(&args);

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, args.config_format)
            .map_err(|e| anyhow::anyhow!("Failed to render configuration: {}", e));
    }

    // Validation guarantees a known level
    setup_logging(config.log_level().unwrap_or(LogLevel::Info));

    info!("Starting test-server");

    let settings = SamplerSettings::from_config(&config);
    let addr = config.listen_addr();

    let state = Arc::new(
        AppState::new(config).map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?,
    );
    info!("Prometheus registry initialized");

    let sampler_handle = sampler::spawn(Sampler::new(
        Arc::new(ProcSource),
        state.metrics.clone(),
        settings,
    ));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr().context("Failed to read listener address")?;

    info!("test-server listening on http://{}", local);
    info!("Metrics endpoint: http://{}/metrics", local);
    info!("Health endpoint: http://{}/health", local);

    let app = router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sampler_handle.shutdown().await;

    info!(
        "test-server stopped gracefully after {}s",
        state.start_time.elapsed().as_secs()
    );
    Ok(())
}
