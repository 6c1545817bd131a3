//! hostingde-webhook binary
//!
//! Loads the process config, builds the solver and serves it until SIGINT
//! or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostingde_webhook::config::Config;
use hostingde_webhook::constants::DEFAULT_CONFIG_PATH;
use hostingde_webhook::registry::RecordRegistry;
use hostingde_webhook::secrets::DirSecretStore;
use hostingde_webhook::solver::HostingDeSolver;
use hostingde_webhook::webhook;

/// Application version
const VERSION: &str = "1.0.0";

//==============================================================================
// Main
//==============================================================================

#[derive(Debug, Parser)]
#[command(name = "hostingde-webhook")]
#[command(version = VERSION)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(Some(args.config)).context("Config load failed")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if config.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let stop = CancellationToken::new();
    let solver = HostingDeSolver::initialize(
        &config.client_settings(),
        Arc::new(DirSecretStore::new(&config.secrets_dir)),
        Arc::new(RecordRegistry::new()),
        stop.clone(),
    )
    .context("Solver initialization failed")?;

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!("Group: {}", config.group_name);
    info!("API: {}", config.api_base);

    let mut sigterm = signal(SignalKind::terminate()).context("SIGTERM handler failed")?;
    let shutdown = stop.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
        }
        shutdown.cancel();
    });

    webhook::serve(
        listener,
        webhook::router(&config.group_name, Arc::new(solver)),
        stop,
    )
    .await
}
