//! Planar polygon predicates over `LatLng` rings.
//!
//! Rings are simple (non self-intersecting) and open: the first vertex is not
//! required to repeat at the end. Longitude is treated as `x` and latitude as
//! `y`; campus-scale polygons are small enough that the planar approximation
//! is exact for containment purposes.

use crate::coord::LatLng;
use crate::math::geodesy::haversine_m;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    /// The ring has too few vertices to be used.
    InvalidPolygon { vertices: usize },
    /// A vertex carries a NaN or infinite component.
    NonFiniteCoordinate { index: usize },
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoError::InvalidPolygon { vertices } => {
                write!(f, "invalid polygon: {vertices} vertices")
            }
            GeoError::NonFiniteCoordinate { index } => {
                write!(f, "invalid polygon: vertex {index} is not finite")
            }
        }
    }
}

impl std::error::Error for GeoError {}

/// Checks that `ring` can take part in containment tests.
///
/// Requires at least three vertices, all finite.
pub fn validate_ring(ring: &[LatLng]) -> Result<(), GeoError> {
    if ring.len() < 3 {
        return Err(GeoError::InvalidPolygon {
            vertices: ring.len(),
        });
    }
    if let Some(index) = ring
        .iter()
        .position(|p| !p.lat.is_finite() || !p.lng.is_finite())
    {
        return Err(GeoError::NonFiniteCoordinate { index });
    }
    Ok(())
}

/// Arithmetic mean of the ring's vertices (not area weighted).
pub fn centroid(ring: &[LatLng]) -> Result<LatLng, GeoError> {
    if ring.is_empty() {
        return Err(GeoError::InvalidPolygon { vertices: 0 });
    }
    let n = ring.len() as f64;
    let (lat, lng) = ring
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    Ok(LatLng::new(lat / n, lng / n))
}

/// Even-odd (ray casting) containment test.
///
/// Edges are scanned as `(i, i - 1 mod n)` and a horizontal ray is cast
/// towards +lng. Points exactly on an edge follow the half-open rule of the
/// crossing test: for an axis-aligned square, points on the bottom and left
/// edges count as inside while points on the top and right edges count as
/// outside. Callers must not rely on edge inclusion.
///
/// Rings with fewer than three vertices contain nothing.
pub fn point_in_polygon(point: LatLng, ring: &[LatLng]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let x = point.lng;
    let y = point.lat;
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lng, ring[i].lat);
        let (xj, yj) = (ring[j].lng, ring[j].lat);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance in meters from `point` to the closest vertex of `ring`.
///
/// Returns `None` for an empty ring.
pub fn nearest_vertex_m(point: LatLng, ring: &[LatLng]) -> Option<f64> {
    ring.iter()
        .map(|v| haversine_m(point, *v))
        .min_by(|a, b| a.total_cmp(b))
}
