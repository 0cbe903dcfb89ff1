use serde::{Deserialize, Serialize};

/// Degrees of displacement applied per display-offset unit.
pub const DISPLAY_OFFSET_DEG: f64 = 0.000_01;

/// WGS84 coordinate in degrees.
///
/// Field names match the JSON documents (`{"lat": .., "lng": ..}`).
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Shifts the coordinate by a screen-space display offset.
    ///
    /// `x` moves along longitude, `y` along latitude.
    pub fn displaced(self, x: f64, y: f64) -> Self {
        Self {
            lat: self.lat + y * DISPLAY_OFFSET_DEG,
            lng: self.lng + x * DISPLAY_OFFSET_DEG,
        }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}
