//! alertdrive-daemon - AlertDrive zone classification daemon
//!
//! Serves the HTTP API: zone classification of location samples, the
//! alert audit log write/query endpoints, and a status probe. Hazard
//! regions are loaded from a zones file at startup and can be reloaded
//! without downtime via SIGHUP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use alertdrive_core::audit::AuditLog;
use alertdrive_core::config::AlertDriveConfig;
use alertdrive_core::zone::SpatialIndex;
use alertdrive_daemon::server;
use alertdrive_daemon::state::AppStateHandle;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// alertdrive-daemon - zone classification and alert audit API
#[derive(Parser, Debug)]
#[command(name = "alertdrive-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "alertdrive.toml")]
    config: PathBuf,

    /// Override the bind address from the config
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AlertDriveConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    // A malformed zones file fails loudly here rather than silently
    // misclassifying; a missing file starts with an empty region set.
    let index = if config.server.zones_file.exists() {
        let index = SpatialIndex::load(&config.server.zones_file).with_context(|| {
            format!(
                "failed to load zones from {}",
                config.server.zones_file.display()
            )
        })?;
        info!(
            regions = index.snapshot().len(),
            zones_file = %config.server.zones_file.display(),
            "loaded hazard regions"
        );
        index
    } else {
        warn!(
            zones_file = %config.server.zones_file.display(),
            "zones file not found; starting with an empty region set"
        );
        SpatialIndex::empty()
    };

    let audit = AuditLog::open(&config.server.audit_db).with_context(|| {
        format!(
            "failed to open audit log at {}",
            config.server.audit_db.display()
        )
    })?;

    let addr: SocketAddr = match args.bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", config.server.bind))?,
    };

    let state = Arc::new(AppStateHandle::new(
        Arc::new(index),
        audit,
        config.server.zones_file.clone(),
    ));

    server::run(state, addr).await
}
