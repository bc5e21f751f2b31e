//! Notification delivery.
//!
//! [`LogNotifier`] writes notifications to the log; device builds plug a
//! platform notification service into the same [`Notifier`] seam. Repeat
//! scheduling stays with the policy engine either way.

use alertdrive_core::policy::{Notification, Notifier};
use async_trait::async_trait;
use tracing::warn;

/// Delivers notifications to the log at warn level.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) {
        warn!(
            persistent = notification.persistent,
            "{}: {}", notification.title, notification.body
        );
    }
}
