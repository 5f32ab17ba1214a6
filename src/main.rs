//! rate-governor demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                    RATE GOVERNOR                     │
//!                   │                                                      │
//!   Client Request  │  ┌──────────┐   ┌──────────┐   ┌──────────────┐      │
//!   ────────────────┼─▶│  http    │──▶│ identity │──▶│   policy     │      │
//!                   │  │admission │   │ resolver │   │   table      │      │
//!                   │  └────┬─────┘   └──────────┘   └──────┬───────┘      │
//!                   │       │                               ▼              │
//!                   │       │                        ┌──────────────┐      │
//!                   │       │                        │   limiter    │      │
//!                   │       │                        │ fixed/sliding│      │
//!                   │       │                        │ /token bucket│      │
//!                   │       │                        └──────┬───────┘      │
//!                   │       │                               ▼              │
//!   Client Response │       ▼                        ┌──────────────┐      │
//!   ◀───────────────┼─ 429 or handler + X-RateLimit  │ window store │◀─┐   │
//!                   │                                └──────────────┘  │   │
//!                   │                              lifecycle::sweeper ─┘   │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use rate_governor::config::{self, GovernorConfig};
use rate_governor::http::{Admission, GovernorServer};
use rate_governor::identity::StaticTokenVerifier;
use rate_governor::lifecycle::{spawn_sweeper, Shutdown};
use rate_governor::limiter::SystemClock;
use rate_governor::observability::{logging, metrics};
use rate_governor::store::MemoryWindowStore;

#[derive(Parser)]
#[command(name = "rate-governor")]
#[command(about = "Per-identity request rate governance", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GovernorConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("rate-governor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        overridden_policies = config.policies.len(),
        prune_interval_secs = config.store.prune_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let verifier = Arc::new(StaticTokenVerifier::from_config(&config.identity.tokens));
    let admission = Arc::new(Admission::from_config(
        &config,
        verifier,
        Arc::new(MemoryWindowStore::new()),
        Arc::new(SystemClock),
    )?);

    let shutdown = Shutdown::new();
    let sweeper = spawn_sweeper(
        admission.limiter().clone(),
        Duration::from_secs(config.store.prune_interval_secs),
        shutdown.subscribe(),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GovernorServer::new(config, admission);
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    server_task.await??;
    sweeper.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
