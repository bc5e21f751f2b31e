//! The sample pipeline: classify, decide, notify, audit.
//!
//! Implements [`SampleSink`] for the reporting loop. Each sample is
//! classified by the daemon, run through the per-device alert policy,
//! and the resulting notification (if any) is delivered. Every
//! Red/Yellow verdict is forwarded to the audit log; a failed audit
//! write is logged and does not fail the sample.

use std::sync::Arc;

use alertdrive_core::geo::Coordinate;
use alertdrive_core::policy::{AlertEngine, Notifier};
use alertdrive_core::reporter::{SampleSink, SinkError};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::api::ApiClient;

/// Sink that classifies samples and drives the alert policy.
pub struct ClassifyingSink {
    api: ApiClient,
    engine: Arc<AlertEngine>,
    notifier: Arc<dyn Notifier>,
    device_id: String,
}

impl ClassifyingSink {
    /// Assemble the pipeline.
    #[must_use]
    pub fn new(
        api: ApiClient,
        engine: Arc<AlertEngine>,
        notifier: Arc<dyn Notifier>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            engine,
            notifier,
            device_id: device_id.into(),
        }
    }
}

#[async_trait]
impl SampleSink for ClassifyingSink {
    async fn push(&self, sample: Coordinate) -> Result<(), SinkError> {
        let verdict = self
            .api
            .check_location(&sample)
            .await
            .map_err(|e| SinkError(e.to_string()))?;

        debug!(
            lat = sample.lat,
            lng = sample.lng,
            zone = verdict.as_str(),
            "sample classified"
        );

        let decision = self.engine.process(&self.device_id, verdict, Utc::now()).await;

        if let Some(notification) = &decision.notification {
            self.notifier.notify(notification).await;
        }

        if let Some(severity) = decision.log_severity {
            if let Err(e) = self.api.log_alert(&sample, severity).await {
                // Audit forwarding is independent of notification
                // delivery; the record is lost, the loop is not.
                warn!("failed to record alert: {e}");
            }
        }

        Ok(())
    }
}
