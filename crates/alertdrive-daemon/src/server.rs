//! HTTP server assembly.
//!
//! Builds the router over the shared state and runs it with graceful
//! shutdown. SIGHUP triggers a no-downtime zones reload.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tracing::{error, info, warn};

use crate::handlers;
use crate::state::SharedState;

/// Build the API router. Exposed for integration tests.
#[must_use]
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/check-location", post(handlers::check_location))
        .route("/api/alerts", post(handlers::log_alert))
        .route("/api/alerts/all", get(handlers::get_alerts))
        .route("/api/status", get(handlers::status))
        .with_state(state)
}

/// Bind and serve the API until shutdown is requested.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run(state: SharedState, addr: SocketAddr) -> Result<()> {
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "AlertDrive API listening");

    #[cfg(unix)]
    spawn_sighup_reload(Arc::clone(&state));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("server error")?;

    Ok(())
}

/// Reload zones on SIGHUP; a bad zones file keeps the previous set.
#[cfg(unix)]
fn spawn_sighup_reload(state: SharedState) {
    tokio::spawn(async move {
        let Ok(mut hup) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
        else {
            warn!("failed to install SIGHUP handler; zones reload disabled");
            return;
        };

        while hup.recv().await.is_some() {
            match state.reload_zones() {
                Ok(count) => info!(regions = count, "zones reloaded"),
                Err(e) => error!("zones reload failed, keeping previous set: {e}"),
            }
        }
    });
}

/// Resolve when Ctrl-C or SIGTERM arrives, or shutdown was requested.
async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl-C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => warn!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    state.request_shutdown();
    info!("shutdown requested");
}
