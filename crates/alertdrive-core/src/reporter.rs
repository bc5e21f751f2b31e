//! The location reporting loop.
//!
//! Keeps a bounded-latency stream of coordinate samples flowing from a
//! platform [`LocationSource`] into a [`SampleSink`] (normally the HTTP
//! transport toward the daemon), and self-heals when the platform
//! subscription dies. Background execution environments terminate
//! long-running subscriptions unpredictably, so the liveness probe and
//! restart are the system's primary resilience guarantee.
//!
//! A dropped sample is never retried: the next interval's sample
//! supersedes it. Repeated restart failures trip a circuit breaker and
//! the failure is surfaced once rather than spammed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::geo::Coordinate;

/// Default interval between coordinate samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between subscription liveness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Errors from the reporting loop.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The platform location source failed to start.
    #[error("location source failed to start: {0}")]
    SourceStart(String),
}

/// Transport failure pushing a sample downstream.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct SinkError(pub String);

/// Reporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Interval between coordinate samples.
    #[serde(default = "default_sample_interval")]
    #[serde(with = "crate::config::humantime_serde")]
    pub sample_interval: Duration,

    /// Interval between subscription liveness probes.
    #[serde(default = "default_probe_interval")]
    #[serde(with = "crate::config::humantime_serde")]
    pub probe_interval: Duration,

    /// Maximum failed restarts within `restart_window` before the
    /// circuit breaker opens.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    /// Time window for counting failed restarts.
    #[serde(default = "default_restart_window")]
    #[serde(with = "crate::config::humantime_serde")]
    pub restart_window: Duration,

    /// Base URL of the daemon's HTTP API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Identifier this device reports under.
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

const fn default_sample_interval() -> Duration {
    DEFAULT_SAMPLE_INTERVAL
}

const fn default_probe_interval() -> Duration {
    DEFAULT_PROBE_INTERVAL
}

const fn default_max_restarts() -> u32 {
    5
}

const fn default_restart_window() -> Duration {
    Duration::from_secs(300)
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_device_id() -> String {
    "device-1".to_string()
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            probe_interval: default_probe_interval(),
            max_restarts: default_max_restarts(),
            restart_window: default_restart_window(),
            endpoint: default_endpoint(),
            device_id: default_device_id(),
        }
    }
}

/// The platform location subscription.
///
/// Models an OS-level location service: a subscription that must be
/// started, can silently die, and yields the device's current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Start (or restart) the platform subscription.
    async fn start(&self) -> Result<(), ReporterError>;

    /// Whether the subscription is still delivering updates.
    async fn is_running(&self) -> bool;

    /// The most recent position, if one is available.
    async fn sample(&self) -> Option<Coordinate>;
}

/// Downstream consumer of coordinate samples.
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Push one sample downstream.
    ///
    /// # Errors
    ///
    /// Returns a transport error; the caller drops the sample and moves
    /// on to the next interval.
    async fn push(&self, sample: Coordinate) -> Result<(), SinkError>;
}

/// Tracks failed restart attempts within a sliding window and opens a
/// circuit breaker when the subscription cannot be revived.
#[derive(Debug)]
struct RestartTracker {
    max_restarts: u32,
    window: chrono::Duration,
    failures: Vec<DateTime<Utc>>,
    circuit_open: bool,
    /// Whether the open circuit has already been surfaced to the user.
    surfaced: bool,
}

impl RestartTracker {
    fn new(max_restarts: u32, window: Duration) -> Self {
        Self {
            max_restarts,
            window: chrono::Duration::from_std(window).unwrap_or_default(),
            failures: Vec::new(),
            circuit_open: false,
            surfaced: false,
        }
    }

    fn record_success(&mut self) {
        self.failures.clear();
        self.circuit_open = false;
        self.surfaced = false;
    }

    fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failures.push(now);
        let window_start = now - self.window;
        self.failures.retain(|t| *t >= window_start);
        if self.failures.len() >= self.max_restarts as usize {
            self.circuit_open = true;
        }
    }

    /// True exactly once per opened circuit.
    fn should_surface(&mut self) -> bool {
        if self.circuit_open && !self.surfaced {
            self.surfaced = true;
            return true;
        }
        false
    }
}

/// The reporting loop over a source and a sink.
pub struct Reporter {
    config: ReporterConfig,
    source: Arc<dyn LocationSource>,
    sink: Arc<dyn SampleSink>,
    active: AtomicBool,
    tracker: Mutex<RestartTracker>,
}

impl Reporter {
    /// Create a reporter; call [`ensure_reporting`](Self::ensure_reporting)
    /// to start it.
    #[must_use]
    pub fn new(
        config: ReporterConfig,
        source: Arc<dyn LocationSource>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        let tracker = RestartTracker::new(config.max_restarts, config.restart_window);
        Self {
            config,
            source,
            sink,
            active: AtomicBool::new(false),
            tracker: Mutex::new(tracker),
        }
    }

    /// Start the reporting loop if it is not already running.
    ///
    /// Idempotent: re-entrant calls are no-ops and never create a second
    /// sampling loop. Returns `true` if this call started the loop.
    pub fn ensure_reporting(self: &Arc<Self>) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("reporting loop already active");
            return false;
        }

        info!(
            sample_interval = ?self.config.sample_interval,
            probe_interval = ?self.config.probe_interval,
            "starting location reporting"
        );

        let reporter = Arc::clone(self);
        tokio::spawn(async move { reporter.run().await });
        true
    }

    /// Whether the loop is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Request the loop to stop at its next tick.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    async fn run(&self) {
        if let Err(e) = self.source.start().await {
            // The probe will keep retrying; not fatal here.
            warn!("initial subscription start failed: {e}");
        }

        let mut sample_tick = tokio::time::interval(self.config.sample_interval);
        let mut probe_tick = tokio::time::interval(self.config.probe_interval);
        sample_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        probe_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            if !self.active.load(Ordering::SeqCst) {
                info!("reporting loop stopped");
                return;
            }

            tokio::select! {
                _ = sample_tick.tick() => self.deliver_sample().await,
                _ = probe_tick.tick() => self.probe().await,
            }
        }
    }

    async fn deliver_sample(&self) {
        let Some(sample) = self.source.sample().await else {
            debug!("no sample available this interval");
            return;
        };

        if let Err(e) = self.sink.push(sample).await {
            // Dropped on purpose: the next interval's sample supersedes
            // this one, and the subscription stays up regardless.
            warn!(lat = sample.lat, lng = sample.lng, "dropping sample: {e}");
        }
    }

    /// Liveness probe: restart the subscription if the platform killed it.
    ///
    /// The tracker mutex makes restart attempts single-flight, so a probe
    /// and any other caller can never race a double restart.
    async fn probe(&self) {
        let mut tracker = self.tracker.lock().await;

        if self.source.is_running().await {
            tracker.record_success();
            return;
        }

        if tracker.circuit_open {
            if tracker.should_surface() {
                error!(
                    max_restarts = self.config.max_restarts,
                    "location subscription could not be revived; giving up until it recovers"
                );
            }
            return;
        }

        info!("location subscription died; restarting");
        match self.source.start().await {
            Ok(()) => tracker.record_success(),
            Err(e) => {
                warn!("subscription restart failed: {e}");
                tracker.record_failure(Utc::now());
                if tracker.should_surface() {
                    error!(
                        max_restarts = self.config.max_restarts,
                        "location subscription could not be revived; giving up until it recovers"
                    );
                }
            },
        }
    }
}
