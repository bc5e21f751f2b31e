//! alertdrive-reporter - AlertDrive location reporter
//!
//! Client-side reliability loop: samples the device position at a fixed
//! interval, classifies each sample against the daemon, and drives the
//! notification-escalation policy. The loop self-heals if the location
//! subscription dies; transport failures drop the affected sample and
//! the next interval supersedes it.

use std::path::PathBuf;
use std::sync::Arc;

use alertdrive_core::config::AlertDriveConfig;
use alertdrive_core::policy::AlertEngine;
use alertdrive_core::reporter::{LocationSource, Reporter, SampleSink};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod notify;
mod pipeline;
mod source;

use api::ApiClient;
use notify::LogNotifier;
use pipeline::ClassifyingSink;
use source::RouteSource;

/// alertdrive-reporter - location sampling and alert delivery
#[derive(Parser, Debug)]
#[command(name = "alertdrive-reporter")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "alertdrive.toml")]
    config: PathBuf,

    /// Route file to replay as the location source
    #[arg(short, long, default_value = "route.json")]
    route: PathBuf,

    /// Override the daemon endpoint from the config
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the device identifier from the config
    #[arg(long)]
    device_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AlertDriveConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let mut reporter_config = config.reporter.clone();
    if let Some(endpoint) = args.endpoint {
        reporter_config.endpoint = endpoint;
    }
    if let Some(device_id) = args.device_id {
        reporter_config.device_id = device_id;
    }

    let api = ApiClient::new(&reporter_config.endpoint)?;
    let engine = Arc::new(AlertEngine::new(config.policy));
    let sink = ClassifyingSink::new(
        api,
        engine,
        Arc::new(LogNotifier),
        reporter_config.device_id.clone(),
    );

    let source = RouteSource::load(&args.route)
        .with_context(|| format!("failed to load route from {}", args.route.display()))?;

    info!(
        endpoint = %reporter_config.endpoint,
        device_id = %reporter_config.device_id,
        "reporter starting"
    );

    let reporter = Arc::new(Reporter::new(
        reporter_config,
        Arc::new(source) as Arc<dyn LocationSource>,
        Arc::new(sink) as Arc<dyn SampleSink>,
    ));
    reporter.ensure_reporting();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    reporter.stop();

    Ok(())
}
