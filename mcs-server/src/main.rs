//! # MCS Process Server
//!
//! Serves the `/process` surface: composite health, sequence control, live
//! sequence status over WebSocket and the pattern, parameter and schema
//! catalogs.
//!
//! Startup loads configuration, assembles the supervisor, then initializes
//! and starts it. A supervisor that cannot be assembled or started does not
//! stop the server: its routes answer 503 and `/process/health` reports the
//! failure.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use mcs_config::{ConfigLoad, ConfigLoader};
use mcs_core::ProcessSupervisor;
use mcs_model::ServiceMode;
use mcs_server::{AppState, build_supervisor, create_app};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "mcs-server")]
#[command(about = "Process supervisor with sequence control and live status streaming")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Alternate .env file
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Operating mode: normal, mock or simulation (overrides config)
    #[arg(long)]
    mode: Option<ServiceMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(mode) = cli.mode {
        config.service.mode = mode;
    }

    let default_filter = format!("{},tower_http=warn", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    let supervisor = match build_supervisor(&config) {
        Ok(supervisor) => Some(supervisor),
        Err(err) => {
            error!(error = %err, "failed to assemble process service");
            None
        }
    };

    if let Some(supervisor) = supervisor.as_ref() {
        bring_up(supervisor).await;
    }

    let state = match supervisor.clone() {
        Some(supervisor) => AppState::new(supervisor),
        None => AppState::without_supervisor(),
    };
    let router = create_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, mode = %config.service.mode, "process server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(supervisor) = supervisor {
        info!("shutting down process service");
        if let Err(err) = supervisor.shutdown().await {
            error!(error = %err, "process service shutdown reported a failure");
        }
    }

    Ok(())
}

async fn bring_up(supervisor: &Arc<ProcessSupervisor>) {
    if let Err(err) = supervisor.initialize().await {
        error!(error = %err, "process service failed to initialize");
        return;
    }
    if let Err(err) = supervisor.start().await {
        error!(error = %err, "process service failed to start");
    }
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
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
