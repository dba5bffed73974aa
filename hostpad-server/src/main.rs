//! # hostpad server
//!
//! Trusted-subnet HTTP endpoint that turns button presses from a browser
//! front-end into host control scripts and shows short "shout" messages as
//! on-screen overlays, one at a time.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use hostpad_config::{Config, ConfigLoad, ConfigLoader, ConfigWarnings};
use hostpad_core::{ShoutQueue, ShoutService, ShutdownOutcome};
use hostpad_server::{create_app, infra::app_state::AppState};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "hostpad-server")]
#[command(
    about = "LAN-only control endpoint with serialized on-screen shout overlays"
)]
struct Cli {
    /// Path to a hostpad.toml configuration file
    #[arg(long, env = "HOSTPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, env = "HOSTPAD_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_server(cli).await
}

fn load_runtime_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &cli.env_file {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path() {
        info!(path = %path.display(), "configuration file loaded");
    }
    log_warnings(&warnings);

    info!(
        allowed_networks = %config.access.allowed_networks,
        hostcontrol = %config.paths.hostcontrol_dir.display(),
        static_dir = %config.paths.static_dir.display(),
        renderer = %config.shout.renderer.display(),
        duration_policy = ?config.shout.duration_policy,
        "configuration in effect"
    );

    Ok(config)
}

fn log_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }
}

async fn run_server(cli: Cli) -> anyhow::Result<()> {
    let config = load_runtime_config(&cli)?;

    let queue = Arc::new(ShoutQueue::new());
    let service =
        ShoutService::start(Arc::clone(&queue), Arc::new(config.renderer()));
    let state = AppState::from_config(&config, queue);
    let router = create_app(state);

    let bind_address = config.server.bind_address();
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            service.stop(config.shutdown_grace).await;
            return Err(err).with_context(|| format!("failed to bind {bind_address}"));
        }
    };
    info!(
        "Starting hostpad (HTTP) on {}",
        listener.local_addr().context("listener has no local address")?
    );

    let make_service = router.into_make_service_with_connect_info::<SocketAddr>();
    let served = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match service.stop(config.shutdown_grace).await {
        ShutdownOutcome::Stopped { .. } => {}
        ShutdownOutcome::TimedOut { dropped } => {
            warn!(dropped, "overlay renderer did not finish before shutdown")
        }
        ShutdownOutcome::Panicked { dropped } => {
            error!(dropped, "shout worker panicked")
        }
    }

    served.context("HTTP server failed")?;
    info!("hostpad stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received; draining");
}
