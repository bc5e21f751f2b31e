//! Notification-escalation policy.
//!
//! A per-device state machine over zone verdicts. Red entries are urgent
//! and persistent: the initial notification is re-emitted at a fixed
//! interval until the device leaves the red zone. Yellow entries are
//! advisory and single-shot. Leaving into None is silent.
//!
//! Decisions derive from the stored [`DeviceState`], not message order,
//! so duplicate delivery of the same verdict at the same instant yields
//! at most one notification. Callers serialize updates to one device via
//! [`DeviceArena`]; distinct devices share no mutable state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::classifier::zone_message;
use crate::zone::{Severity, ZoneVerdict};

/// Default interval between repeated red-zone notifications.
pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum time between repeated notifications for an active red
    /// escalation.
    #[serde(default = "default_repeat_interval")]
    #[serde(with = "crate::config::humantime_serde")]
    pub repeat_interval: Duration,
}

const fn default_repeat_interval() -> Duration {
    DEFAULT_REPEAT_INTERVAL
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            repeat_interval: DEFAULT_REPEAT_INTERVAL,
        }
    }
}

/// Mutable per-device record driving transition decisions.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    /// Verdict from the previous classification.
    pub last_verdict: ZoneVerdict,
    /// When the device was last notified, if ever.
    pub last_notified_at: Option<DateTime<Utc>>,
    /// Whether a red escalation is currently active.
    pub escalation_active: bool,
}

/// A notification for the platform notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Whether this notification is part of a repeating escalation.
    pub persistent: bool,
}

impl Notification {
    fn enter_red() -> Self {
        Self {
            title: "Red Zone Alert!".to_string(),
            body: zone_message(ZoneVerdict::Red).to_string(),
            persistent: true,
        }
    }

    fn enter_yellow() -> Self {
        Self {
            title: "Caution: Yellow Zone".to_string(),
            body: zone_message(ZoneVerdict::Yellow).to_string(),
            persistent: false,
        }
    }
}

/// Outcome of applying one verdict to one device.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    /// Notification to deliver, if the transition warrants one.
    pub notification: Option<Notification>,
    /// Severity to append to the audit log (every Red/Yellow verdict,
    /// notification or not; None verdicts are not logged).
    pub log_severity: Option<Severity>,
}

/// Delivery seam for the platform notification service.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Implementations log failures; delivery is
    /// best-effort.
    async fn notify(&self, notification: &Notification);
}

/// The transition function over device state.
#[derive(Debug, Clone, Default)]
pub struct AlertPolicy {
    config: PolicyConfig,
}

impl AlertPolicy {
    /// Create a policy with the given configuration.
    #[must_use]
    pub const fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Apply one verdict to a device's state and decide what to emit.
    ///
    /// This is the transition table:
    ///
    /// - entering Red emits "enter-red" and arms the escalation;
    /// - staying Red re-emits only once `repeat_interval` has elapsed
    ///   since the last notification (the persistent nag);
    /// - entering Yellow emits "enter-yellow" once and clears any
    ///   escalation in the same step, so no red repeat can fire after
    ///   the device is confirmed out of the red zone;
    /// - entering None clears silently;
    /// - Yellow→Yellow and None→None are no-ops.
    pub fn evaluate(
        &self,
        state: &mut DeviceState,
        verdict: ZoneVerdict,
        now: DateTime<Utc>,
    ) -> Decision {
        let notification = match verdict {
            ZoneVerdict::Red => {
                if state.last_verdict == ZoneVerdict::Red && state.escalation_active {
                    if self.repeat_due(state, now) {
                        state.last_notified_at = Some(now);
                        Some(Notification::enter_red())
                    } else {
                        None
                    }
                } else {
                    state.escalation_active = true;
                    state.last_notified_at = Some(now);
                    Some(Notification::enter_red())
                }
            },
            ZoneVerdict::Yellow => {
                state.escalation_active = false;
                if state.last_verdict == ZoneVerdict::Yellow {
                    None
                } else {
                    state.last_notified_at = Some(now);
                    Some(Notification::enter_yellow())
                }
            },
            ZoneVerdict::None => {
                state.escalation_active = false;
                None
            },
        };

        state.last_verdict = verdict;

        Decision {
            notification,
            log_severity: verdict.severity(),
        }
    }

    fn repeat_due(&self, state: &DeviceState, now: DateTime<Utc>) -> bool {
        let Some(last) = state.last_notified_at else {
            return true;
        };
        let interval =
            chrono::Duration::from_std(self.config.repeat_interval).unwrap_or_default();
        now - last >= interval
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

/// Arena of per-device state, keyed by device identifier.
///
/// Each device gets its own async mutex so concurrent classifications for
/// the same device serialize their read-modify-write, while distinct
/// devices proceed fully in parallel. Entries are created on first report
/// and kept for the process lifetime.
#[derive(Debug, Default)]
pub struct DeviceArena {
    devices: Mutex<HashMap<String, Arc<AsyncMutex<DeviceState>>>>,
}

impl DeviceArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to a device's state cell, created on first access.
    #[must_use]
    pub fn device(&self, device_id: &str) -> Arc<AsyncMutex<DeviceState>> {
        let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            devices
                .entry(device_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(DeviceState::default()))),
        )
    }

    /// Number of devices seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no device has reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Policy plus arena: the full engine for multi-device deployments.
#[derive(Debug, Default)]
pub struct AlertEngine {
    policy: AlertPolicy,
    arena: DeviceArena,
}

impl AlertEngine {
    /// Create an engine with the given policy configuration.
    #[must_use]
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            policy: AlertPolicy::new(config),
            arena: DeviceArena::new(),
        }
    }

    /// Apply one verdict for one device, serialized against other updates
    /// to the same device.
    pub async fn process(
        &self,
        device_id: &str,
        verdict: ZoneVerdict,
        now: DateTime<Utc>,
    ) -> Decision {
        let cell = self.arena.device(device_id);
        let mut state = cell.lock().await;
        self.policy.evaluate(&mut state, verdict, now)
    }

    /// The device arena.
    #[must_use]
    pub const fn arena(&self) -> &DeviceArena {
        &self.arena
    }
}
