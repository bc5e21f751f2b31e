//! HTTP client for the daemon's API.

use std::time::Duration;

use alertdrive_core::geo::Coordinate;
use alertdrive_core::zone::{Severity, ZoneVerdict};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Client for the daemon's classification and audit endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckLocationResponse {
    zone: String,
    #[allow(dead_code)]
    message: String,
}

impl ApiClient {
    /// Create a client for the daemon at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Classify one sample via `POST /api/check-location`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// unrecognized zone in the response.
    pub async fn check_location(&self, point: &Coordinate) -> Result<ZoneVerdict> {
        let response = self
            .http
            .post(format!("{}/api/check-location", self.base_url))
            .json(&serde_json::json!({ "lat": point.lat, "lng": point.lng }))
            .send()
            .await
            .context("check-location request failed")?
            .error_for_status()
            .context("check-location returned an error status")?;

        let body: CheckLocationResponse = response
            .json()
            .await
            .context("check-location response was not valid JSON")?;

        match ZoneVerdict::parse(&body.zone) {
            Some(verdict) => Ok(verdict),
            None => bail!("unrecognized zone '{}' in response", body.zone),
        }
    }

    /// Record a zone entry via `POST /api/alerts`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn log_alert(&self, point: &Coordinate, severity: Severity) -> Result<()> {
        self.http
            .post(format!("{}/api/alerts", self.base_url))
            .json(&serde_json::json!({
                "lat": point.lat,
                "lng": point.lng,
                "zoneType": severity.as_str(),
            }))
            .send()
            .await
            .context("log-alert request failed")?
            .error_for_status()
            .context("log-alert returned an error status")?;

        Ok(())
    }
}
