//! Shared daemon state.
//!
//! Provides thread-safe shared state for the HTTP handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alertdrive_core::audit::AuditLog;
use alertdrive_core::classifier::ZoneClassifier;
use alertdrive_core::zone::{SpatialIndex, ZoneError, load_region_set};
use chrono::{DateTime, Utc};

/// Shared daemon state, cloned into every handler.
pub type SharedState = Arc<AppStateHandle>;

/// Handle to daemon state with interior mutability where needed.
pub struct AppStateHandle {
    /// Spatial index over the current hazard region snapshot.
    index: Arc<SpatialIndex>,
    /// Classifier over the index.
    classifier: ZoneClassifier,
    /// Append-only alert store.
    audit: AuditLog,
    /// Zones file consulted on reload.
    zones_file: PathBuf,
    /// Shutdown flag (atomic for lock-free checking).
    shutdown: AtomicBool,
    /// Time when the daemon started.
    started_at: DateTime<Utc>,
}

impl AppStateHandle {
    /// Create a new state handle.
    #[must_use]
    pub fn new(index: Arc<SpatialIndex>, audit: AuditLog, zones_file: PathBuf) -> Self {
        let classifier = ZoneClassifier::new(Arc::clone(&index));
        Self {
            index,
            classifier,
            audit,
            zones_file,
            shutdown: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    /// The zone classifier.
    #[must_use]
    pub const fn classifier(&self) -> &ZoneClassifier {
        &self.classifier
    }

    /// The audit log.
    #[must_use]
    pub const fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Re-read the zones file and atomically swap in the new region set.
    ///
    /// In-flight classifications keep the old snapshot; there is no
    /// downtime. Returns the number of regions loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the zones file is unreadable or invalid; the
    /// previous region set stays in effect.
    pub fn reload_zones(&self) -> Result<usize, ZoneError> {
        let regions = load_region_set(&self.zones_file)?;
        let count = regions.len();
        self.index.reload(regions);
        Ok(count)
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Get daemon uptime in seconds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // max(0) ensures non-negative
    pub fn uptime_secs(&self) -> u64 {
        let now = Utc::now();
        (now - self.started_at).num_seconds().max(0) as u64
    }
}
