//! Hazard regions and the spatial index.
//!
//! Regions are polygonal areas tagged with a severity tier. The spatial
//! index holds an immutable snapshot of the full region set and answers
//! point membership queries; administrative reloads swap in a fresh
//! snapshot without blocking queries against the old one.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{Coordinate, point_in_polygon};

/// Errors from region loading and validation.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// Zones file could not be read.
    #[error("failed to read zones file: {0}")]
    Io(#[from] std::io::Error),

    /// Zones file is not valid JSON.
    #[error("failed to parse zones file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A region polygon has fewer than 3 vertices.
    #[error("region '{name}' has {count} vertices; polygons need at least 3")]
    DegeneratePolygon {
        /// Name of the offending region.
        name: String,
        /// Vertex count found.
        count: usize,
    },

    /// A region vertex is outside WGS-84 bounds.
    #[error("region '{name}' has an out-of-range vertex ({lat}, {lng})")]
    InvalidVertex {
        /// Name of the offending region.
        name: String,
        /// Latitude of the bad vertex.
        lat: f64,
        /// Longitude of the bad vertex.
        lng: f64,
    },
}

/// Severity tier of a hazard region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Moderate accident-prone area; advisory.
    Yellow,
    /// High accident-prone area; urgent.
    Red,
}

impl Severity {
    /// Wire representation, matching the HTTP `zoneType` field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
        }
    }

    /// Parse the wire representation. Case-sensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Red" => Some(Self::Red),
            "Yellow" => Some(Self::Yellow),
            _ => None,
        }
    }
}

/// Result of classifying one coordinate against the full region set.
///
/// The ordering gives the precedence law: `Red > Yellow > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ZoneVerdict {
    /// Outside every region.
    #[default]
    None,
    /// Inside a yellow region and no red region.
    Yellow,
    /// Inside a red region.
    Red,
}

impl ZoneVerdict {
    /// Wire representation, matching the HTTP `zone` field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::None => "None",
        }
    }

    /// Parse the wire representation. Case-sensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Red" => Some(Self::Red),
            "Yellow" => Some(Self::Yellow),
            "None" => Some(Self::None),
            _ => None,
        }
    }

    /// The severity carried by this verdict, if any.
    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Self::Red => Some(Severity::Red),
            Self::Yellow => Some(Severity::Yellow),
            Self::None => None,
        }
    }
}

impl From<Option<Severity>> for ZoneVerdict {
    fn from(value: Option<Severity>) -> Self {
        match value {
            Some(Severity::Red) => Self::Red,
            Some(Severity::Yellow) => Self::Yellow,
            None => Self::None,
        }
    }
}

/// A named polygonal hazard region.
///
/// The vertex sequence is implicitly closed. Regions are reference data:
/// loaded once, replaced wholesale on reload, never mutated in place.
#[derive(Debug, Clone)]
pub struct Region {
    /// Administrative name of the region.
    pub name: String,
    /// Severity tier.
    pub severity: Severity,
    /// Polygon vertices, at least 3.
    pub vertices: Vec<Coordinate>,
}

impl Region {
    /// Create a region, validating the polygon.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon has fewer than 3 vertices or any
    /// vertex is outside WGS-84 bounds. Self-intersection is not checked.
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        vertices: Vec<Coordinate>,
    ) -> Result<Self, ZoneError> {
        let name = name.into();

        if vertices.len() < 3 {
            return Err(ZoneError::DegeneratePolygon {
                name,
                count: vertices.len(),
            });
        }

        if let Some(bad) = vertices.iter().find(|v| !v.is_valid()) {
            return Err(ZoneError::InvalidVertex {
                name,
                lat: bad.lat,
                lng: bad.lng,
            });
        }

        Ok(Self {
            name,
            severity,
            vertices,
        })
    }

    /// Even-odd membership test for a point.
    #[must_use]
    pub fn contains(&self, point: &Coordinate) -> bool {
        point_in_polygon(point, &self.vertices)
    }
}

/// Immutable snapshot of the full region set, split by severity so red
/// regions can be scanned first.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    red: Vec<Region>,
    yellow: Vec<Region>,
}

impl RegionSet {
    /// Build a region set from validated regions.
    #[must_use]
    pub fn new(regions: Vec<Region>) -> Self {
        let (red, yellow) = regions
            .into_iter()
            .partition(|r| r.severity == Severity::Red);
        Self { red, yellow }
    }

    /// Total region count across both tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.red.len() + self.yellow.len()
    }

    /// Whether the set holds no regions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.red.is_empty() && self.yellow.is_empty()
    }

    /// Highest-severity tier containing the point, if any.
    ///
    /// Red regions are scanned first and short-circuit: red strictly
    /// dominates, so yellow regions are never evaluated for a point
    /// already known to be in a red region. Scan order within a tier is
    /// irrelevant since same-severity matches are equivalent and region
    /// identity is not surfaced.
    #[must_use]
    pub fn classify_point(&self, point: &Coordinate) -> Option<Severity> {
        if self.red.iter().any(|r| r.contains(point)) {
            return Some(Severity::Red);
        }
        if self.yellow.iter().any(|r| r.contains(point)) {
            return Some(Severity::Yellow);
        }
        None
    }
}

/// On-disk zones file: two arrays of named polygons, one per tier.
///
/// ```json
/// {
///   "red_zones": [{ "name": "Old Bridge", "vertices": [[12.97, 77.59], ...] }],
///   "yellow_zones": []
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
struct ZonesFile {
    #[serde(default)]
    red_zones: Vec<ZoneEntry>,
    #[serde(default)]
    yellow_zones: Vec<ZoneEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ZoneEntry {
    name: String,
    /// Vertices as `[lat, lng]` pairs.
    vertices: Vec<[f64; 2]>,
}

impl ZoneEntry {
    fn into_region(self, severity: Severity) -> Result<Region, ZoneError> {
        let vertices = self
            .vertices
            .into_iter()
            .map(|[lat, lng]| Coordinate::new(lat, lng))
            .collect();
        Region::new(self.name, severity, vertices)
    }
}

/// Thread-safe spatial index over the current region snapshot.
///
/// Queries clone an `Arc` to the snapshot under a short read lock, so a
/// concurrent [`reload`](Self::reload) never blocks an in-flight
/// classification and a query never observes a half-replaced set.
#[derive(Debug)]
pub struct SpatialIndex {
    regions: RwLock<Arc<RegionSet>>,
}

impl SpatialIndex {
    /// Create an index over an initial region set.
    #[must_use]
    pub fn new(regions: RegionSet) -> Self {
        Self {
            regions: RwLock::new(Arc::new(regions)),
        }
    }

    /// Create an empty index; every query returns `None` until a reload.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(RegionSet::default())
    }

    /// Load an index from a zones file.
    ///
    /// # Errors
    ///
    /// Fails loudly on unreadable files, malformed JSON, or degenerate
    /// polygons, so misconfigured regions are caught at load time rather
    /// than silently misclassifying.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ZoneError> {
        Ok(Self::new(load_region_set(path)?))
    }

    /// Highest-severity tier containing the point, if any.
    #[must_use]
    pub fn classify_point(&self, point: &Coordinate) -> Option<Severity> {
        self.snapshot().classify_point(point)
    }

    /// Atomically replace the region set.
    pub fn reload(&self, regions: RegionSet) {
        let mut guard = self.regions.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(regions);
    }

    /// Current snapshot of the region set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegionSet> {
        Arc::clone(&self.regions.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Parse and validate a zones file into a region set.
///
/// # Errors
///
/// Returns an error on I/O failure, malformed JSON, or invalid polygons.
pub fn load_region_set(path: impl AsRef<Path>) -> Result<RegionSet, ZoneError> {
    let content = std::fs::read_to_string(path)?;
    parse_region_set(&content)
}

/// Parse a zones file from a JSON string.
///
/// # Errors
///
/// Returns an error on malformed JSON or invalid polygons.
pub fn parse_region_set(content: &str) -> Result<RegionSet, ZoneError> {
    let file: ZonesFile = serde_json::from_str(content)?;

    let mut regions = Vec::with_capacity(file.red_zones.len() + file.yellow_zones.len());
    for entry in file.red_zones {
        regions.push(entry.into_region(Severity::Red)?);
    }
    for entry in file.yellow_zones {
        regions.push(entry.into_region(Severity::Yellow)?);
    }

    Ok(RegionSet::new(regions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(severity: Severity, name: &str) -> Region {
        Region::new(
            name,
            severity,
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.0, 2.0),
                Coordinate::new(2.0, 2.0),
                Coordinate::new(2.0, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_verdict_precedence_ordering() {
        assert!(ZoneVerdict::Red > ZoneVerdict::Yellow);
        assert!(ZoneVerdict::Yellow > ZoneVerdict::None);
    }

    #[test]
    fn test_red_short_circuits_yellow() {
        // Same square tagged both ways: red must win.
        let set = RegionSet::new(vec![
            square(Severity::Yellow, "overlap-y"),
            square(Severity::Red, "overlap-r"),
        ]);

        assert_eq!(
            set.classify_point(&Coordinate::new(1.0, 1.0)),
            Some(Severity::Red)
        );
    }

    #[test]
    fn test_sample_scenario() {
        // Red square [(0,0),(0,2),(2,2),(2,0)].
        let set = RegionSet::new(vec![square(Severity::Red, "test")]);

        assert_eq!(
            set.classify_point(&Coordinate::new(1.0, 1.0)),
            Some(Severity::Red)
        );
        assert_eq!(set.classify_point(&Coordinate::new(5.0, 5.0)), None);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let err = Region::new(
            "bad",
            Severity::Red,
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ZoneError::DegeneratePolygon { count: 2, .. }
        ));
    }

    #[test]
    fn test_invalid_vertex_rejected() {
        let err = Region::new(
            "bad",
            Severity::Red,
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.0, 200.0),
                Coordinate::new(1.0, 1.0),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, ZoneError::InvalidVertex { .. }));
    }

    #[test]
    fn test_parse_zones_file() {
        let json = r#"{
            "red_zones": [
                { "name": "junction", "vertices": [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]] }
            ],
            "yellow_zones": [
                { "name": "school", "vertices": [[10.0, 10.0], [10.0, 12.0], [12.0, 12.0], [12.0, 10.0]] }
            ]
        }"#;

        let set = parse_region_set(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.classify_point(&Coordinate::new(1.0, 1.0)),
            Some(Severity::Red)
        );
        assert_eq!(
            set.classify_point(&Coordinate::new(11.0, 11.0)),
            Some(Severity::Yellow)
        );
    }

    #[test]
    fn test_parse_rejects_degenerate_zone() {
        let json = r#"{ "red_zones": [{ "name": "dot", "vertices": [[0.0, 0.0]] }] }"#;
        assert!(parse_region_set(json).is_err());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let index = SpatialIndex::empty();
        let point = Coordinate::new(1.0, 1.0);
        assert_eq!(index.classify_point(&point), None);

        // A query holding the old snapshot keeps seeing the old set.
        let before = index.snapshot();

        index.reload(RegionSet::new(vec![square(Severity::Red, "new")]));
        assert_eq!(index.classify_point(&point), Some(Severity::Red));
        assert_eq!(before.classify_point(&point), None);
    }

    #[test]
    fn test_wire_round_trip() {
        assert_eq!(ZoneVerdict::parse("Red"), Some(ZoneVerdict::Red));
        assert_eq!(ZoneVerdict::parse("None"), Some(ZoneVerdict::None));
        // Case-sensitive: the original frontend's lowercase comparison was
        // a bug, not a contract.
        assert_eq!(ZoneVerdict::parse("red"), None);
        assert_eq!(Severity::parse("Yellow"), Some(Severity::Yellow));
        assert_eq!(Severity::parse("None"), None);
    }
}
