use crate::coord::LatLng;

/// Axis-aligned lat/lng bounding box (degrees, inclusive).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    /// `[lng, lat]`
    pub min: [f64; 2],
    /// `[lng, lat]`
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut min = [first.lng, first.lat];
        let mut max = [first.lng, first.lat];
        for p in points.iter().skip(1) {
            min[0] = min[0].min(p.lng);
            min[1] = min[1].min(p.lat);
            max[0] = max[0].max(p.lng);
            max[1] = max[1].max(p.lat);
        }
        Some(Aabb2::new(min, max))
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lng >= self.min[0] && p.lng <= self.max[0] && p.lat >= self.min[1] && p.lat <= self.max[1]
    }
}
