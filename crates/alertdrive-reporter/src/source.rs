//! Location sources.
//!
//! [`RouteSource`] replays a recorded route from a JSON file, cycling
//! through its coordinates. It stands in for a platform location service
//! on headless deployments; device builds plug their own
//! [`LocationSource`] into the same seam.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use alertdrive_core::geo::Coordinate;
use alertdrive_core::reporter::{LocationSource, ReporterError};
use anyhow::{Context, Result, ensure};
use async_trait::async_trait;

/// Replays coordinates from a route file, in order, wrapping around.
///
/// The route file is a JSON array of `[lat, lng]` pairs.
#[derive(Debug)]
pub struct RouteSource {
    route: Vec<Coordinate>,
    position: AtomicUsize,
    running: AtomicBool,
}

impl RouteSource {
    /// Load a route from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, malformed, or empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read route file {}", path.as_ref().display())
        })?;
        let pairs: Vec<[f64; 2]> =
            serde_json::from_str(&content).context("route file must be a JSON array of [lat, lng] pairs")?;
        ensure!(!pairs.is_empty(), "route file contains no coordinates");

        Ok(Self::from_coordinates(
            pairs
                .into_iter()
                .map(|[lat, lng]| Coordinate::new(lat, lng))
                .collect(),
        ))
    }

    /// Build a source from an in-memory route.
    #[must_use]
    pub fn from_coordinates(route: Vec<Coordinate>) -> Self {
        Self {
            route,
            position: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LocationSource for RouteSource {
    async fn start(&self) -> Result<(), ReporterError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn sample(&self) -> Option<Coordinate> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        let idx = self.position.fetch_add(1, Ordering::SeqCst);
        Some(self.route[idx % self.route.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_cycles() {
        let source = RouteSource::from_coordinates(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ]);

        // No samples before the subscription starts.
        assert!(source.sample().await.is_none());

        source.start().await.unwrap();
        assert_eq!(source.sample().await.unwrap().lat, 1.0);
        assert_eq!(source.sample().await.unwrap().lat, 2.0);
        assert_eq!(source.sample().await.unwrap().lat, 1.0);
    }

    #[test]
    fn test_load_rejects_empty_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(RouteSource::load(&path).is_err());
    }

    #[test]
    fn test_load_route_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        std::fs::write(&path, "[[12.97, 77.59], [12.98, 77.60]]").unwrap();

        let source = RouteSource::load(&path).unwrap();
        assert_eq!(source.route.len(), 2);
    }
}
