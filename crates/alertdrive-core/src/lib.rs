//! alertdrive-core - AlertDrive core library
//!
//! Provides the building blocks shared by the AlertDrive daemon and the
//! location reporter:
//!
//! - [`geo`]: coordinate values and point-in-polygon geometry
//! - [`zone`]: hazard regions and the spatial index
//! - [`classifier`]: zone verdicts for coordinate samples
//! - [`policy`]: the notification-escalation state machine
//! - [`audit`]: the append-only alert store
//! - [`reporter`]: the self-healing location sampling loop
//! - [`config`]: TOML configuration shared by both binaries

pub mod audit;
pub mod classifier;
pub mod config;
pub mod geo;
pub mod policy;
pub mod reporter;
pub mod zone;

pub use audit::{AlertRecord, AuditError, AuditLog};
pub use classifier::{ZoneClassifier, zone_message};
pub use config::{AlertDriveConfig, ConfigError};
pub use geo::Coordinate;
pub use policy::{DeviceArena, Notification, Notifier, PolicyConfig};
pub use reporter::{LocationSource, Reporter, ReporterConfig, SampleSink};
pub use zone::{Region, RegionSet, Severity, SpatialIndex, ZoneError, ZoneVerdict};
