//! Zone classification of coordinate samples.
//!
//! A thin, stateless wrapper over the spatial index: pure function of the
//! coordinate and the current region snapshot, no memory of prior calls.

use std::sync::Arc;

use crate::geo::Coordinate;
use crate::zone::{SpatialIndex, ZoneVerdict};

/// Human message carried on the wire next to a verdict.
#[must_use]
pub const fn zone_message(verdict: ZoneVerdict) -> &'static str {
    match verdict {
        ZoneVerdict::Red => "You are in a high accident-prone area!",
        ZoneVerdict::Yellow => "Caution: You are in a moderate accident-prone area.",
        ZoneVerdict::None => "You are in a safe zone.",
    }
}

/// Classifies coordinates against the shared spatial index.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    index: Arc<SpatialIndex>,
}

impl ZoneClassifier {
    /// Create a classifier over a shared spatial index.
    #[must_use]
    pub fn new(index: Arc<SpatialIndex>) -> Self {
        Self { index }
    }

    /// Verdict for a single coordinate against the current region set.
    #[must_use]
    pub fn classify(&self, point: &Coordinate) -> ZoneVerdict {
        self.index.classify_point(point).into()
    }
}
