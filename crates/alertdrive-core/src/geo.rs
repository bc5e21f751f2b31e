//! Coordinate values and point-in-polygon geometry.
//!
//! Polygons are tested with the even-odd ray-casting rule on a flat-earth
//! approximation: edges are treated as straight segments in (lat, lng)
//! space. At the scale of a single municipality the error is negligible;
//! continent-scale regions would need proper great-circle handling.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude degrees.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and within WGS-84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Even-odd ray-cast membership test.
///
/// The polygon is the vertex sequence with an implicit closing edge from
/// the last vertex back to the first. A horizontal ray is cast from the
/// point toward +lng; an odd crossing count means the point is inside.
/// Points exactly on an edge may land on either side; callers needing
/// boundary guarantees should buffer their polygons.
///
/// Self-intersecting polygons give even-odd semantics, which may not match
/// the author's intent; region loading is expected to reject degenerate
/// input (fewer than 3 vertices) before this is ever called.
#[must_use]
pub fn point_in_polygon(point: &Coordinate, vertices: &[Coordinate]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let a = &vertices[i];
        let b = &vertices[j];

        let crosses = (a.lat > point.lat) != (b.lat > point.lat);
        if crosses {
            let intersect_lng = (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng;
            if point.lng < intersect_lng {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}
